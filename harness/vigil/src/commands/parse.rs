//! The `parse` command: dump a fixture's directives.

use std::path::Path;

use vigil_check::Anchor;
use vigil_fixture::{Directive, Fixture, ParseOptions, Requirement, Sink};

use super::suite_config_for;

fn join(list: &[Requirement]) -> String {
    list.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn describe(directive: &Directive) -> String {
    match directive {
        Directive::Run(step) => {
            let sink = match &step.sink {
                Sink::None => String::new(),
                Sink::CheckOutput { prefix } => format!(", check {prefix}"),
                Sink::VerifyDiagnostics => ", verify".to_string(),
            };
            let not = if step.expect_failure { "not " } else { "" };
            format!("RUN [{}{sink}] {not}{}", step.stage, step.command)
        }
        Directive::Requires(list) => format!("REQUIRES {}", join(list)),
        Directive::Unsupported(list) => format!("UNSUPPORTED {}", join(list)),
        Directive::XFail(list) => format!("XFAIL {}", join(list)),
        Directive::Prereq(name) => format!("PREREQ {name}"),
        Directive::Check {
            prefix,
            expectation,
        } => {
            let suffix = if expectation.anchor == Anchor::Next { "-NEXT" } else { "" };
            format!("{prefix}{suffix} {}", expectation.pattern)
        }
        Directive::Expected(expected) => format!("expected {expected}"),
    }
}

/// Returns the exit code.
pub fn parse_fixture(fixture_path: &str) -> i32 {
    let path = Path::new(fixture_path);
    let verify_flag = match suite_config_for(path) {
        Ok(suite) => suite.verify_flag,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };
    let options = ParseOptions {
        verify_flag,
        check_prefixes: Vec::new(),
    };
    match Fixture::load(path, &options) {
        Ok(fixture) => {
            println!("{}: {} directives", path.display(), fixture.directives.len());
            for annotated in &fixture.directives {
                println!("{:>5}  {}", annotated.line, describe(&annotated.directive));
            }
            0
        }
        Err(e) => {
            eprintln!("error: {}: {e}", path.display());
            1
        }
    }
}
