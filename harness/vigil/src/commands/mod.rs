//! Command handlers for the Vigil CLI.
//!
//! Each handler returns the process exit code: 0 on success, 1 when tests
//! or expectations fail, 2 when the harness could not run at all.

mod filecheck;
mod parse;
mod verify;

use std::io::Read;
use std::path::Path;

pub use filecheck::filecheck;
pub use parse::parse_fixture;
pub use test::{run_tests, TestOptions};
pub use verify::verify_output;

/// Read `path`, or stdin when `path` is `None` or `-`.
fn read_input(path: Option<&str>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) if path != "-" => {
            std::fs::read(path).map_err(|e| format!("failed to read {path}: {e}"))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

/// The suite config governing `path`, or the defaults.
fn suite_config_for(path: &Path) -> Result<vigil::SuiteConfig, String> {
    match vigil::SuiteConfig::discover(path) {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(vigil::SuiteConfig::default()),
        Err(e) => Err(e.to_string()),
    }
}
