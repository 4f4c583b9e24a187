//! Test result types.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::TestError;

/// Where a fixture is in its lifecycle.
///
/// `Pending → Building → Running → Matching → {Passed, Failed}`. A failure
/// jumps straight to `Failed`; the stage it left is kept on the result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TestStage {
    #[default]
    Pending,
    Building,
    Running,
    Matching,
    Passed,
    Failed,
}

impl TestStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStage::Pending => "pending",
            TestStage::Building => "building",
            TestStage::Running => "running",
            TestStage::Matching => "matching",
            TestStage::Passed => "passed",
            TestStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TestStage::Passed | TestStage::Failed)
    }
}

impl fmt::Display for TestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single fixture.
#[derive(Debug)]
pub enum TestOutcome {
    Passed,
    Failed(TestError),
    Skipped(String),
    /// Marked `XFAIL` and failed as expected.
    ExpectedFailure(TestError),
    /// Marked `XFAIL` but passed.
    UnexpectedPass,
    Cancelled,
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TestOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestOutcome::Skipped(_))
    }

    pub fn is_expected_failure(&self) -> bool {
        matches!(self, TestOutcome::ExpectedFailure(_))
    }

    pub fn is_unexpected_pass(&self) -> bool {
        matches!(self, TestOutcome::UnexpectedPass)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TestOutcome::Cancelled)
    }

    /// The pass flag: true unless the fixture failed or was cancelled.
    ///
    /// XFAIL outcomes pass; an unexpected pass is only a warning.
    pub fn passed(&self) -> bool {
        !matches!(self, TestOutcome::Failed(_) | TestOutcome::Cancelled)
    }

    /// Stable label for reports and idempotence comparisons.
    pub fn label(&self) -> &'static str {
        match self {
            TestOutcome::Passed => "PASS",
            TestOutcome::Failed(_) => "FAIL",
            TestOutcome::Skipped(_) => "SKIP",
            TestOutcome::ExpectedFailure(_) => "XFAIL",
            TestOutcome::UnexpectedPass => "XPASS",
            TestOutcome::Cancelled => "CANCELLED",
        }
    }
}

/// Result of running a single fixture.
#[derive(Debug)]
pub struct TestResult {
    pub path: PathBuf,
    pub outcome: TestOutcome,
    /// Terminal stage: `Passed` or `Failed`.
    pub stage: TestStage,
    /// Stage the fixture was in when it failed.
    pub failed_stage: Option<TestStage>,
    /// Step log: stage transitions and command templates.
    pub log: Vec<String>,
    pub duration: Duration,
}

impl TestResult {
    pub fn passed(path: PathBuf, log: Vec<String>, duration: Duration) -> Self {
        TestResult {
            path,
            outcome: TestOutcome::Passed,
            stage: TestStage::Passed,
            failed_stage: None,
            log,
            duration,
        }
    }

    #[cold]
    pub fn failed(
        path: PathBuf,
        error: TestError,
        failed_stage: TestStage,
        log: Vec<String>,
        duration: Duration,
    ) -> Self {
        TestResult {
            path,
            outcome: TestOutcome::Failed(error),
            stage: TestStage::Failed,
            failed_stage: Some(failed_stage),
            log,
            duration,
        }
    }

    /// A failure in a fixture marked `XFAIL`.
    pub fn expected_failure(
        path: PathBuf,
        error: TestError,
        failed_stage: TestStage,
        log: Vec<String>,
        duration: Duration,
    ) -> Self {
        TestResult {
            path,
            outcome: TestOutcome::ExpectedFailure(error),
            stage: TestStage::Failed,
            failed_stage: Some(failed_stage),
            log,
            duration,
        }
    }

    #[cold]
    pub fn skipped(path: PathBuf, reason: String) -> Self {
        TestResult {
            path,
            outcome: TestOutcome::Skipped(reason),
            stage: TestStage::Pending,
            failed_stage: None,
            log: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    #[cold]
    pub fn cancelled(path: PathBuf, log: Vec<String>, duration: Duration) -> Self {
        TestResult {
            path,
            outcome: TestOutcome::Cancelled,
            stage: TestStage::Failed,
            failed_stage: None,
            log,
            duration,
        }
    }

    /// The error behind a failure or expected failure.
    pub fn error(&self) -> Option<&TestError> {
        match &self.outcome {
            TestOutcome::Failed(error) | TestOutcome::ExpectedFailure(error) => Some(error),
            _ => None,
        }
    }
}

/// Overall summary of a suite run.
#[derive(Debug, Default)]
pub struct TestSummary {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub expected_failures: usize,
    pub unexpected_passes: usize,
    pub cancelled: usize,
    pub duration: Duration,
}

impl TestSummary {
    pub fn new() -> Self {
        TestSummary::default()
    }

    pub fn add_result(&mut self, result: TestResult) {
        match &result.outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed(_) => self.failed += 1,
            TestOutcome::Skipped(_) => self.skipped += 1,
            TestOutcome::ExpectedFailure(_) => self.expected_failures += 1,
            TestOutcome::UnexpectedPass => self.unexpected_passes += 1,
            TestOutcome::Cancelled => self.cancelled += 1,
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.passed
            + self.failed
            + self.skipped
            + self.expected_failures
            + self.unexpected_passes
            + self.cancelled
    }

    /// Cancelled fixtures count as failures: the suite did not finish.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.cancelled > 0
    }

    /// Get exit code: 0 = all pass, 1 = failures, 2 = no tests found.
    pub fn exit_code(&self) -> i32 {
        if self.total() == 0 {
            2
        } else {
            i32::from(self.has_failures())
        }
    }
}
