//! The `filecheck` command: match `CHECK` lines against arbitrary text.

use std::path::Path;

use vigil::report::unified_diff;
use vigil_check::{MatchOptions, Matcher};
use vigil_fixture::{Fixture, ParseOptions, DEFAULT_CHECK_PREFIX};

use super::{read_input, suite_config_for};

/// Match the `prefix` lines of `check_file` against `input` (or stdin).
/// Returns the exit code.
pub fn filecheck(check_file: &str, prefix: Option<&str>, input: Option<&str>) -> i32 {
    let path = Path::new(check_file);
    let suite = match suite_config_for(path) {
        Ok(suite) => suite,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };

    let prefix = prefix.unwrap_or(DEFAULT_CHECK_PREFIX);
    let options = ParseOptions {
        verify_flag: suite.verify_flag.clone(),
        check_prefixes: vec![prefix.to_string()],
    };
    let fixture = match Fixture::load(path, &options) {
        Ok(fixture) => fixture,
        Err(e) => {
            eprintln!("error: {}: {e}", path.display());
            return 2;
        }
    };
    let checks = fixture.checks(prefix);
    if checks.is_empty() {
        eprintln!("error: no {prefix} lines in {}", path.display());
        return 2;
    }

    let text = match read_input(input).map(String::from_utf8) {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => {
            eprintln!("error: input is not valid UTF-8");
            return 2;
        }
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };
    let lines: Vec<&str> = text.lines().collect();

    let matcher = Matcher::new(MatchOptions {
        strict_whitespace: suite.strict_whitespace,
        allow_trailing_output: suite.allow_trailing_output,
    });
    let result = matcher.run(&checks, &lines);
    if result.success {
        return 0;
    }

    eprintln!("{}: {prefix} lines did not match", path.display());
    for line in &result.diagnostics {
        eprintln!("  {line}");
    }
    let expected: Vec<String> = checks.iter().map(|c| c.pattern.as_str().to_string()).collect();
    let actual: Vec<String> = lines.iter().map(|l| (*l).to_string()).collect();
    eprint!("{}", unified_diff(&expected, &actual));
    1
}
