//! Fixture parsing.
//!
//! A fixture is a source file whose comments carry the test:
//!
//! - `RUN:` lines with the commands to execute
//! - `REQUIRES:`, `UNSUPPORTED:`, `XFAIL:` and `PREREQ:` lines
//! - `CHECK:` / `CHECK-NEXT:` lines matched against captured output
//! - `expected-error@-1 {{...}}` annotations verified against diagnostics
//!
//! Parsing is line-oriented and produces one [`Directive`] per annotation.

mod directive;
mod error;
mod fixture;
mod parser;

pub use directive::{Annotated, Directive, Requirement, RunStep, Sink, Stage};
pub use error::FixtureError;
pub use fixture::Fixture;
pub use parser::{parse, ParseOptions, DEFAULT_CHECK_PREFIX, DEFAULT_VERIFY_FLAG};
