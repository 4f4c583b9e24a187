//! The `verify` command: check captured compiler output against a
//! fixture's `expected-*` annotations.

use std::path::Path;

use vigil_fixture::{Fixture, ParseOptions};

use super::{read_input, suite_config_for};

/// Returns the exit code.
pub fn verify_output(fixture_path: &str, input: Option<&str>) -> i32 {
    let path = Path::new(fixture_path);
    let suite = match suite_config_for(path) {
        Ok(suite) => suite,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };
    let options = ParseOptions {
        verify_flag: suite.verify_flag,
        check_prefixes: Vec::new(),
    };
    let fixture = match Fixture::load(path, &options) {
        Ok(fixture) => fixture,
        Err(e) => {
            eprintln!("error: {}: {e}", path.display());
            return 2;
        }
    };

    let output = match read_input(input) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };
    let records = match vigil_diagnostic::collect(&output) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("error: malformed diagnostic output: {e}");
            return 2;
        }
    };

    let expected = fixture.expected_diagnostics();
    let verification = vigil_diagnostic::verify(path, &expected, &records);
    if verification.passed() {
        println!(
            "OK: {} expected diagnostics, {} reported",
            expected.len(),
            records.len()
        );
        return 0;
    }

    eprintln!("{}: diagnostics did not verify", path.display());
    for line in verification.describe() {
        eprintln!("  {line}");
    }
    1
}
