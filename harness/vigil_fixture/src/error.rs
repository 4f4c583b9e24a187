//! Fixture parse errors.

use std::path::PathBuf;

use vigil_check::PatternError;

/// Errors parsing a fixture.
///
/// All of these make the fixture unrunnable; the runner reports them as
/// harness errors.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {prefix}-NEXT without a previous {prefix} line")]
    NextWithoutPrevious { line: u32, prefix: String },
    #[error("line {line}: unsupported check directive `{directive}:`")]
    UnknownCheckSuffix { line: u32, directive: String },
    #[error("line {line}: found empty check string with prefix `{prefix}:`")]
    EmptyCheck { line: u32, prefix: String },
    #[error("line {line}: invalid check pattern: {source}")]
    Pattern {
        line: u32,
        #[source]
        source: PatternError,
    },
    #[error("no check lines with prefix `{prefix}` for RUN line {line}")]
    NoChecks { line: u32, prefix: String },
    #[error("line {line}: RUN line ends with `\\` but no RUN line follows")]
    UnterminatedContinuation { line: u32 },
    #[error("line {line}: unsupported %FileCheck option `{option}`")]
    UnsupportedCheckOption { line: u32, option: String },
    #[error("line {line}: empty {directive} directive")]
    EmptyDirective { line: u32, directive: &'static str },
    #[error("line {line}: invalid prerequisite name `{name}`")]
    InvalidPrereqName { line: u32, name: String },
    #[error("line {line}: malformed anchor `@{anchor}`")]
    MalformedAnchor { line: u32, anchor: String },
    #[error("line {line}: anchor `@{anchor}` points outside the file")]
    OffsetOutOfRange { line: u32, anchor: String },
    #[error("line {line}: expected `{{{{` after expected-{severity}")]
    MissingMessage { line: u32, severity: String },
    #[error("line {line}: unterminated `{{{{` in expected-{severity}")]
    UnterminatedMessage { line: u32, severity: String },
    #[error("line {line}: malformed fix-it `{{{{{text}}}}}`")]
    MalformedFixIt { line: u32, text: String },
}
