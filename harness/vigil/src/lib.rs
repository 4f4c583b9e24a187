//! Vigil test harness driver.
//!
//! Runs compiler fixtures end to end: parse their directives, build shared
//! prerequisites, execute each `RUN` step, and match captured output
//! against `CHECK` lines or `expected-*` diagnostic annotations.
//!
//! ```text
//! discover ──► parse ──► gate (REQUIRES/UNSUPPORTED) ──► workspace
//!     ──► prerequisites ──► RUN steps ──► match / verify ──► TestResult
//! ```
//!
//! The library crates (`vigil_check`, `vigil_log`, `vigil_diagnostic`,
//! `vigil_fixture`) do the parsing and matching; this crate orchestrates
//! processes and turns every failure into a [`TestError`].

use std::sync::Once;

pub mod build_cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod process;
pub mod report;
pub mod result;
pub mod runner;
pub mod substitute;
pub mod workspace;
pub mod xfail;

pub use config::{ConfigError, SuiteConfig};
pub use error::{HarnessError, MatchReport, ProcessFailure, StepFailure, TestError};
pub use process::CancelToken;
pub use result::{TestOutcome, TestResult, TestStage, TestSummary};
pub use runner::{run_tests, TestRunner, TestRunnerConfig};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Reads the filter from `VIGIL_LOG`, falling back to `RUST_LOG`; does
/// nothing if neither is set. With `VIGIL_LOG_TREE` set, spans print as a
/// tree. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = match std::env::var("VIGIL_LOG") {
            Ok(directives) => EnvFilter::new(directives),
            Err(_) if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
            Err(_) => return,
        };

        if std::env::var_os("VIGIL_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .init();
        }
    });
}
