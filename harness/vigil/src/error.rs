//! Test failure taxonomy.
//!
//! Library crates report their own errors; they are folded into
//! [`TestError`] here, at the orchestrator boundary.

use std::fmt;

use vigil_fixture::FixtureError;

use crate::substitute::SubstituteError;

/// Why a step's process did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProcessFailure {
    #[error("exited with code {0}")]
    ExitCode(i32),
    #[error("killed by signal {0}")]
    Signal(i32),
    #[error("succeeded but was expected to fail")]
    UnexpectedSuccess,
    #[error("timed out after {0}s")]
    TimedOut(u64),
    #[error("failed to start: {0}")]
    Spawn(String),
    #[error("cancelled")]
    Cancelled,
}

/// A build or run step that failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{origin}: `{command}` {failure}")]
pub struct StepFailure {
    /// `RUN line 4` or `prerequisite PlaygroundSupport`.
    pub origin: String,
    /// The command template, before substitution.
    pub command: String,
    pub failure: ProcessFailure,
    pub stdout: String,
    pub stderr: String,
}

/// What a match step compared.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MatchTarget {
    Checks { prefix: String },
    Diagnostics,
}

impl fmt::Display for MatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTarget::Checks { prefix } => write!(f, "{prefix} lines"),
            MatchTarget::Diagnostics => write!(f, "expected diagnostics"),
        }
    }
}

/// Output that was produced but did not satisfy the expectations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("RUN line {line}: {target} did not match")]
pub struct MatchReport {
    pub line: u32,
    pub target: MatchTarget,
    /// The RUN line as written in the fixture.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Failure description: expected pattern, actual line, cursor.
    pub details: Vec<String>,
    /// Expectations as written, for the diff.
    pub expected: Vec<String>,
    /// Collected output lines, for the diff.
    pub actual: Vec<String>,
}

/// The harness itself could not do its job.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    #[error("malformed instrumentation output: {0}")]
    Log(#[from] vigil_log::CollectError),
    #[error("malformed diagnostic output: {0}")]
    Diagnostics(#[from] vigil_diagnostic::CollectError),
    #[error("substitution failed: {0}")]
    Substitute(#[from] SubstituteError),
    #[error("unknown prerequisite `{0}` (add it to [prerequisites] in vigil.toml)")]
    UnknownPrerequisite(String),
    #[error("failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Why a fixture did not pass.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// A `REQUIRES`/`UNSUPPORTED` gate excluded the fixture.
    #[error("skipped: {0}")]
    PrerequisiteSkipped(String),
    #[error("build failure: {0}")]
    BuildFailure(StepFailure),
    #[error("runtime failure: {0}")]
    RuntimeFailure(StepFailure),
    #[error("match failure: {0}")]
    MatchFailure(MatchReport),
    #[error("harness error: {0}")]
    HarnessError(#[from] HarnessError),
}

impl TestError {
    /// The step failure, for build and runtime failures.
    pub fn step(&self) -> Option<&StepFailure> {
        match self {
            TestError::BuildFailure(step) | TestError::RuntimeFailure(step) => Some(step),
            TestError::PrerequisiteSkipped(_)
            | TestError::MatchFailure(_)
            | TestError::HarnessError(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.step()
            .is_some_and(|step| step.failure == ProcessFailure::Cancelled)
    }
}

impl From<FixtureError> for TestError {
    fn from(err: FixtureError) -> Self {
        TestError::HarnessError(err.into())
    }
}

impl From<SubstituteError> for TestError {
    fn from(err: SubstituteError) -> Self {
        TestError::HarnessError(err.into())
    }
}

impl From<vigil_log::CollectError> for TestError {
    fn from(err: vigil_log::CollectError) -> Self {
        TestError::HarnessError(err.into())
    }
}

impl From<vigil_diagnostic::CollectError> for TestError {
    fn from(err: vigil_diagnostic::CollectError) -> Self {
        TestError::HarnessError(err.into())
    }
}
