use super::*;
use crate::{RunStep, Stage};
use pretty_assertions::assert_eq;
use vigil_diagnostic::{ExpectedFixIt, FixItExpectation, Severity};

const PLAYGROUND: &str =
    include_str!("../../tests/fixtures/implicit_return_func_binaryoperation_args.swift");
const APPLICATION_MAIN: &str =
    include_str!("../../tests/fixtures/attr_UIApplicationMain_multiple.swift");

fn parse_default(source: &str) -> Result<Vec<Annotated>, FixtureError> {
    parse(source, &ParseOptions::default())
}

fn steps(directives: &[Annotated]) -> Vec<&RunStep> {
    directives
        .iter()
        .filter_map(|a| match &a.directive {
            Directive::Run(step) => Some(step),
            _ => None,
        })
        .collect()
}

fn checks(directives: &[Annotated]) -> Vec<(u32, Anchor, String)> {
    directives
        .iter()
        .filter_map(|a| match &a.directive {
            Directive::Check { expectation, .. } => Some((
                a.line,
                expectation.anchor,
                expectation.pattern.as_str().to_string(),
            )),
            _ => None,
        })
        .collect()
}

fn expected(directives: &[Annotated]) -> Vec<&vigil_diagnostic::ExpectedDiagnostic> {
    directives
        .iter()
        .filter_map(|a| match &a.directive {
            Directive::Expected(e) => Some(e),
            _ => None,
        })
        .collect()
}

#[test]
fn test_playground_run_steps() {
    let directives = parse_default(PLAYGROUND).unwrap();
    let steps = steps(&directives);
    assert_eq!(steps.len(), 9);

    assert_eq!(steps[0].command, "%empty-directory(%t)");
    assert_eq!(steps[0].stage, Stage::Build);
    assert_eq!(steps[0].sink, Sink::None);

    assert_eq!(steps[5].line, 6);
    assert_eq!(steps[5].command, "%target-run %t/main");
    assert_eq!(steps[5].source, "%target-run %t/main | %FileCheck %s");
    assert_eq!(steps[5].stage, Stage::Run);
    assert_eq!(
        steps[5].sink,
        Sink::CheckOutput {
            prefix: "CHECK".to_string()
        }
    );
    assert_eq!(steps[8].line, 9);
    assert_eq!(steps[8].command, "%target-run %t/main2");
    assert!(steps.iter().all(|s| !s.expect_failure));
}

#[test]
fn test_playground_checks() {
    let directives = parse_default(PLAYGROUND).unwrap();
    let checks = checks(&directives);
    assert_eq!(checks.len(), 6);
    assert_eq!(
        checks[0],
        (
            18,
            Anchor::Exact,
            "{{.*}} __builtin_log_scope_entry".to_string()
        )
    );
    assert!(checks[1..].iter().all(|(_, anchor, _)| *anchor == Anchor::Next));
    assert_eq!(checks[5].2, "{{.*}} __builtin_log[='7']");
}

#[test]
fn test_playground_requires() {
    let directives = parse_default(PLAYGROUND).unwrap();
    let requires: Vec<_> = directives
        .iter()
        .filter_map(|a| match &a.directive {
            Directive::Requires(list) => Some(list.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(requires, vec![vec![Requirement::parse("executable_test")]]);
}

#[test]
fn test_application_main_annotations() {
    let directives = parse_default(APPLICATION_MAIN).unwrap();
    let expected = expected(&directives);
    assert_eq!(expected.len(), 9);

    let targets: Vec<_> = expected
        .iter()
        .map(|e| (e.severity, e.target_line().unwrap()))
        .collect();
    assert_eq!(
        targets,
        vec![
            (Severity::Error, 7),
            (Severity::Warning, 7),
            (Severity::Note, 7),
            (Severity::Error, 13),
            (Severity::Warning, 13),
            (Severity::Note, 13),
            (Severity::Error, 19),
            (Severity::Warning, 19),
            (Severity::Note, 19),
        ]
    );
    assert_eq!(
        expected[0].message(),
        "'UIApplicationMain' attribute can only apply to one class in a module"
    );
    assert_eq!(expected[0].fix_its, FixItExpectation::Unchecked);
    assert_eq!(
        expected[2].fix_its,
        FixItExpectation::Exact(vec![ExpectedFixIt::new(1, 19, "@main")])
    );
}

#[test]
fn test_application_main_verify_step() {
    let directives = parse_default(APPLICATION_MAIN).unwrap();
    let steps = steps(&directives);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].sink, Sink::VerifyDiagnostics);
    assert_eq!(
        steps[0].command,
        "%target-swift-frontend(mock-sdk: %clang-importer-sdk) -typecheck -parse-as-library %s"
    );
    assert_eq!(steps[0].stage, Stage::Build);
}

#[test]
fn test_mock_sdk_colon_is_not_a_directive() {
    // `mock-sdk:` inside the RUN line must not be mistaken for anything.
    let directives = parse_default(APPLICATION_MAIN).unwrap();
    assert!(checks(&directives).is_empty());
}

#[test]
fn test_continuation_lines() {
    let source = "\
// RUN: %target-build-swift \\
// RUN:   -o %t/main \\
// RUN:   %s
";
    let directives = parse_default(source).unwrap();
    let steps = steps(&directives);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].line, 1);
    assert_eq!(steps[0].command, "%target-build-swift -o %t/main %s");
}

#[test]
fn test_unterminated_continuation() {
    let err = parse_default("// RUN: echo \\\nint x;\n").unwrap_err();
    assert!(matches!(err, FixtureError::UnterminatedContinuation { line: 1 }));
}

#[test]
fn test_not_prefix() {
    let directives = parse_default("// RUN: not %target-run %t/main\n").unwrap();
    let steps = steps(&directives);
    assert!(steps[0].expect_failure);
    assert_eq!(steps[0].command, "%target-run %t/main");
    assert_eq!(steps[0].stage, Stage::Run);
}

#[test]
fn test_check_prefix_option() {
    let source = "\
// RUN: %target-run %t/main | %FileCheck %s --check-prefix=OUT
// OUT: hello
// OUT-NEXT: world
// CHECK: ignored
";
    let directives = parse_default(source).unwrap();
    let steps = steps(&directives);
    assert_eq!(
        steps[0].sink,
        Sink::CheckOutput {
            prefix: "OUT".to_string()
        }
    );
    let prefixes: Vec<_> = directives
        .iter()
        .filter_map(|a| match &a.directive {
            Directive::Check { prefix, .. } => Some(prefix.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(prefixes, vec!["OUT", "OUT", "CHECK"]);
}

#[test]
fn test_unsupported_check_option() {
    let err = parse_default("// RUN: a | %FileCheck %s --dump-input=fail\n// CHECK: x\n").unwrap_err();
    assert!(matches!(
        err,
        FixtureError::UnsupportedCheckOption { line: 1, .. }
    ));
}

#[test]
fn test_no_checks_for_prefix() {
    let err = parse_default("// RUN: a | %FileCheck %s --check-prefix=OUT\n// CHECK: x\n")
        .unwrap_err();
    assert!(matches!(err, FixtureError::NoChecks { line: 1, .. }));
}

#[test]
fn test_next_without_previous() {
    let err = parse_default("// CHECK-NEXT: x\n// CHECK: y\n").unwrap_err();
    assert!(matches!(
        err,
        FixtureError::NextWithoutPrevious { line: 1, .. }
    ));
}

#[test]
fn test_unknown_check_suffix() {
    let err = parse_default("// CHECK: x\n// CHECK-FOO: y\n").unwrap_err();
    match err {
        FixtureError::UnknownCheckSuffix { line, directive } => {
            assert_eq!(line, 2);
            assert_eq!(directive, "CHECK-FOO");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_empty_check() {
    let err = parse_default("// CHECK:   \n").unwrap_err();
    assert!(matches!(err, FixtureError::EmptyCheck { line: 1, .. }));
}

#[test]
fn test_bad_check_pattern() {
    let err = parse_default("// CHECK: {{unterminated\n").unwrap_err();
    assert!(matches!(err, FixtureError::Pattern { line: 1, .. }));
}

#[test]
fn test_empty_requires() {
    let err = parse_default("// REQUIRES:\n").unwrap_err();
    assert!(matches!(
        err,
        FixtureError::EmptyDirective {
            line: 1,
            directive: "REQUIRES"
        }
    ));
}

#[test]
fn test_prereq_name() {
    let directives = parse_default("// PREREQ: PlaygroundSupport\n").unwrap();
    assert_eq!(
        directives[0].directive,
        Directive::Prereq("PlaygroundSupport".to_string())
    );
    assert!(matches!(
        parse_default("// PREREQ: a b\n").unwrap_err(),
        FixtureError::InvalidPrereqName { line: 1, .. }
    ));
}

#[test]
fn test_anchor_forms() {
    let source = "\
line one
line two
x // expected-error@1 {{absolute}}
x // expected-warning@:5 {{column}}
x // expected-note@-1:3 {{both}}
x // expected-remark@+1 {{next line}}
last
";
    let directives = parse_default(source).unwrap();
    let expected = expected(&directives);
    let summary: Vec<_> = expected
        .iter()
        .map(|e| (e.target_line().unwrap(), e.column))
        .collect();
    assert_eq!(
        summary,
        vec![(1, None), (4, Some(5)), (4, Some(3)), (7, None)]
    );
}

#[test]
fn test_offset_out_of_range() {
    let err = parse_default("x // expected-error@-1 {{m}}\n").unwrap_err();
    assert!(matches!(err, FixtureError::OffsetOutOfRange { line: 1, .. }));
    let err = parse_default("x // expected-error@+1 {{m}}\n").unwrap_err();
    assert!(matches!(err, FixtureError::OffsetOutOfRange { line: 1, .. }));
}

#[test]
fn test_malformed_anchor() {
    let err = parse_default("x // expected-error@x {{m}}\n").unwrap_err();
    assert!(matches!(err, FixtureError::MalformedAnchor { line: 1, .. }));
}

#[test]
fn test_multiple_annotations_per_line() {
    let directives =
        parse_default("x // expected-error {{a}} expected-note {{b}} {{none}}\n").unwrap();
    let expected = expected(&directives);
    assert_eq!(expected.len(), 2);
    assert_eq!(expected[0].message(), "a");
    assert_eq!(expected[0].fix_its, FixItExpectation::Unchecked);
    assert_eq!(expected[1].message(), "b");
    assert_eq!(expected[1].fix_its, FixItExpectation::None);
}

#[test]
fn test_multiple_fix_its() {
    let directives = parse_default("x // expected-error {{m}} {{1-2=a}} {{5-5=}}\n").unwrap();
    assert_eq!(
        expected(&directives)[0].fix_its,
        FixItExpectation::Exact(vec![ExpectedFixIt::new(1, 2, "a"), ExpectedFixIt::new(5, 5, "")])
    );
}

#[test]
fn test_annotation_errors() {
    assert!(matches!(
        parse_default("x // expected-error oops\n").unwrap_err(),
        FixtureError::MissingMessage { line: 1, .. }
    ));
    assert!(matches!(
        parse_default("x // expected-error {{oops\n").unwrap_err(),
        FixtureError::UnterminatedMessage { line: 1, .. }
    ));
    assert!(matches!(
        parse_default("x // expected-error {{m}} {{1=x}}\n").unwrap_err(),
        FixtureError::MalformedFixIt { line: 1, .. }
    ));
}

#[test]
fn test_custom_verify_flag() {
    let options = ParseOptions {
        verify_flag: "-verify-diagnostics".to_string(),
        ..ParseOptions::default()
    };
    let directives = parse("// RUN: tool -verify %s\n// RUN: tool -verify-diagnostics %s\n", &options)
        .unwrap();
    let steps = steps(&directives);
    assert_eq!(steps[0].sink, Sink::None);
    assert_eq!(steps[0].command, "tool -verify %s");
    assert_eq!(steps[1].sink, Sink::VerifyDiagnostics);
    assert_eq!(steps[1].command, "tool %s");
}

#[test]
fn test_run_inside_word_is_not_a_directive() {
    let directives = parse_default("// XRUN: nothing\n// PRE-RUN: nothing\n").unwrap();
    assert!(directives.is_empty());
}

#[test]
fn test_extra_check_prefixes() {
    let options = ParseOptions {
        check_prefixes: vec!["LOG".to_string()],
        ..ParseOptions::default()
    };
    let directives = parse("// LOG: a\n// LOG-NEXT: b\n", &options).unwrap();
    assert_eq!(checks(&directives).len(), 2);
    assert!(parse_default("// LOG: a\n").unwrap().is_empty());
}
