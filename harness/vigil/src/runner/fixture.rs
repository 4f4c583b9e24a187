//! One fixture, start to finish.

use std::path::Path;
use std::time::Instant;

use vigil_check::Matcher;
use vigil_fixture::{Fixture, RunStep, Sink, Stage};

use super::RunContext;
use crate::config::Prerequisite;
use crate::error::{HarnessError, MatchReport, MatchTarget, ProcessFailure, StepFailure, TestError};
use crate::process::{run_shell, Exit, ProcessError, ProcessOutput};
use crate::result::{TestOutcome, TestResult, TestStage};
use crate::substitute::Substitutions;
use crate::workspace::Workspace;

/// Stage tracking and the step log for one fixture.
struct FixtureRun<'p> {
    path: &'p Path,
    stage: TestStage,
    log: Vec<String>,
    expect_failure: bool,
}

impl<'p> FixtureRun<'p> {
    fn new(path: &'p Path) -> Self {
        FixtureRun {
            path,
            stage: TestStage::Pending,
            log: Vec::new(),
            expect_failure: false,
        }
    }

    fn enter(&mut self, stage: TestStage) {
        if self.stage == stage {
            return;
        }
        tracing::debug!(
            fixture = %self.path.display(),
            from = %self.stage,
            to = %stage,
            "stage transition"
        );
        self.stage = stage;
        self.log.push(format!("stage: {stage}"));
    }

    fn execute(&mut self, ctx: &RunContext<'_>) -> Result<(), TestError> {
        let fixture = Fixture::load(self.path, &ctx.parse_options)?;
        if let Some(reason) = fixture.skip_reason(&ctx.features) {
            return Err(TestError::PrerequisiteSkipped(reason));
        }
        self.expect_failure =
            fixture.expects_failure(&ctx.features) || ctx.xfail.contains(self.path);

        // Dropped on every exit path below, removing the directory.
        let workspace = Workspace::create().map_err(HarnessError::Workspace)?;
        let mut subs = Substitutions::for_fixture(self.path, &workspace.output(), workspace.root());
        subs.extend_from_config(&ctx.suite.substitutions)?;

        let prerequisites = fixture.prerequisites();
        if !prerequisites.is_empty() {
            self.enter(TestStage::Building);
        }
        for name in prerequisites {
            let prereq = ctx
                .suite
                .prerequisites
                .get(name)
                .ok_or_else(|| HarnessError::UnknownPrerequisite(name.to_string()))?;
            self.log.push(format!("prerequisite: {name}"));
            let dir = ctx
                .cache
                .get_or_build(name, |out| build_prerequisite(name, prereq, out, ctx))
                .map_err(TestError::BuildFailure)?;
            subs.add_prerequisite(name, &dir);
        }

        let cwd = self.path.parent().unwrap_or_else(|| Path::new("."));
        for step in fixture.run_steps() {
            self.enter(match step.stage {
                Stage::Build => TestStage::Building,
                Stage::Run => TestStage::Running,
            });
            self.log.push(format!("RUN line {}: {}", step.line, step.source));

            let command = subs.apply(&step.command)?;
            tracing::trace!(fixture = %self.path.display(), line = step.line, %command, "running step");
            let output = run_shell(&command, cwd, ctx.timeout, ctx.cancel)
                .map_err(|err| process_error(step, err))?;
            check_exit(step, &output)?;

            match &step.sink {
                Sink::None => {}
                Sink::CheckOutput { prefix } => {
                    self.enter(TestStage::Matching);
                    match_checks(&fixture, step, prefix, &output, ctx)?;
                }
                Sink::VerifyDiagnostics => {
                    self.enter(TestStage::Matching);
                    verify_diagnostics(&fixture, step, &output)?;
                }
            }
        }
        Ok(())
    }
}

/// Run one fixture and classify the result.
pub fn run_fixture(path: &Path, ctx: &RunContext<'_>) -> TestResult {
    let start = Instant::now();
    if ctx.cancel.is_cancelled() {
        return TestResult::cancelled(path.to_path_buf(), Vec::new(), start.elapsed());
    }

    let mut run = FixtureRun::new(path);
    let outcome = run.execute(ctx);
    let duration = start.elapsed();
    let failed_stage = run.stage;
    let path = path.to_path_buf();

    match outcome {
        Ok(()) => {
            run.enter(TestStage::Passed);
            if run.expect_failure {
                tracing::warn!(fixture = %path.display(), "XPASS: fixture marked XFAIL passed");
                TestResult {
                    outcome: TestOutcome::UnexpectedPass,
                    ..TestResult::passed(path, run.log, duration)
                }
            } else {
                TestResult::passed(path, run.log, duration)
            }
        }
        Err(TestError::PrerequisiteSkipped(reason)) => {
            tracing::debug!(fixture = %path.display(), %reason, "skipped");
            TestResult::skipped(path, reason)
        }
        Err(err) if err.is_cancelled() => TestResult::cancelled(path, run.log, duration),
        Err(err) => {
            run.enter(TestStage::Failed);
            if run.expect_failure {
                TestResult::expected_failure(path, err, failed_stage, run.log, duration)
            } else {
                TestResult::failed(path, err, failed_stage, run.log, duration)
            }
        }
    }
}

fn build_prerequisite(
    name: &str,
    prereq: &Prerequisite,
    out: &Path,
    ctx: &RunContext<'_>,
) -> Result<(), StepFailure> {
    let fail = |failure: ProcessFailure, stdout: &[u8], stderr: &[u8]| StepFailure {
        origin: format!("prerequisite {name}"),
        command: prereq.command.clone(),
        failure,
        stdout: String::from_utf8_lossy(stdout).into_owned(),
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    };

    let root = if ctx.suite.root.as_os_str().is_empty() {
        Path::new(".")
    } else {
        ctx.suite.root.as_path()
    };
    let mut subs = Substitutions::default();
    subs.insert("%o", out.to_string_lossy());
    subs.insert("%S", root.to_string_lossy());
    let command = subs
        .extend_from_config(&ctx.suite.substitutions)
        .and_then(|()| subs.apply(&prereq.command))
        .map_err(|e| fail(ProcessFailure::Spawn(e.to_string()), &[], &[]))?;

    match run_shell(&command, root, ctx.timeout, ctx.cancel) {
        Ok(output) if output.exit.success() => Ok(()),
        Ok(output) => Err(fail(
            exit_failure(output.exit),
            &output.stdout,
            &output.stderr,
        )),
        Err(ProcessError::TimedOut { after, stdout, stderr }) => Err(fail(
            ProcessFailure::TimedOut(after.as_secs()),
            &stdout,
            &stderr,
        )),
        Err(ProcessError::Cancelled) => Err(fail(ProcessFailure::Cancelled, &[], &[])),
        Err(ProcessError::Spawn(e) | ProcessError::Wait(e)) => {
            Err(fail(ProcessFailure::Spawn(e.to_string()), &[], &[]))
        }
    }
}

fn exit_failure(exit: Exit) -> ProcessFailure {
    match exit {
        Exit::Code(code) => ProcessFailure::ExitCode(code),
        Exit::Signal(signal) => ProcessFailure::Signal(signal),
    }
}

/// Wrap a step failure in the error kind for the step's stage.
fn step_error(step: &RunStep, failure: ProcessFailure, stdout: &[u8], stderr: &[u8]) -> TestError {
    let failure = StepFailure {
        origin: format!("RUN line {}", step.line),
        command: step.source.clone(),
        failure,
        stdout: String::from_utf8_lossy(stdout).into_owned(),
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    };
    match step.stage {
        Stage::Build => TestError::BuildFailure(failure),
        Stage::Run => TestError::RuntimeFailure(failure),
    }
}

fn process_error(step: &RunStep, err: ProcessError) -> TestError {
    match err {
        ProcessError::Spawn(e) => step_error(step, ProcessFailure::Spawn(e.to_string()), &[], &[]),
        ProcessError::Wait(e) => HarnessError::Wait(e).into(),
        ProcessError::TimedOut { after, stdout, stderr } => {
            step_error(step, ProcessFailure::TimedOut(after.as_secs()), &stdout, &stderr)
        }
        ProcessError::Cancelled => step_error(step, ProcessFailure::Cancelled, &[], &[]),
    }
}

/// Apply the exit rules.
///
/// Signals always fail; only crash signals are decoded from `sh`'s 128+N
/// status, so `not` accepts codes like 130. `not` steps must exit
/// non-zero, verify steps included. Other verify steps accept any exit
/// code, since the tool reports errors by failing. Everything else must
/// succeed.
fn check_exit(step: &RunStep, output: &ProcessOutput) -> Result<(), TestError> {
    let failure = match output.exit {
        Exit::Signal(signal) => Some(ProcessFailure::Signal(signal)),
        Exit::Code(0) if step.expect_failure => Some(ProcessFailure::UnexpectedSuccess),
        Exit::Code(_) if step.sink == Sink::VerifyDiagnostics => None,
        Exit::Code(code) if code != 0 && !step.expect_failure => Some(ProcessFailure::ExitCode(code)),
        Exit::Code(_) => None,
    };
    match failure {
        Some(failure) => Err(step_error(step, failure, &output.stdout, &output.stderr)),
        None => Ok(()),
    }
}

fn match_checks(
    fixture: &Fixture,
    step: &RunStep,
    prefix: &str,
    output: &ProcessOutput,
    ctx: &RunContext<'_>,
) -> Result<(), TestError> {
    // A truncated stream is a harness error, never a mismatch.
    let events = vigil_log::collect_bytes(&output.stdout)?;
    let checks = fixture.checks(prefix);
    let result = Matcher::new(ctx.match_options).run(&checks, &events);
    if result.success {
        return Ok(());
    }
    Err(TestError::MatchFailure(MatchReport {
        line: step.line,
        target: MatchTarget::Checks {
            prefix: prefix.to_string(),
        },
        command: step.source.clone(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        details: result.diagnostics,
        expected: checks.iter().map(|c| c.pattern.as_str().to_string()).collect(),
        actual: events.into_iter().map(|e| e.text).collect(),
    }))
}

fn verify_diagnostics(
    fixture: &Fixture,
    step: &RunStep,
    output: &ProcessOutput,
) -> Result<(), TestError> {
    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&String::from_utf8_lossy(&output.stdout));

    let records = vigil_diagnostic::collect(&text)?;
    let expected = fixture.expected_diagnostics();
    let verification = vigil_diagnostic::verify(&fixture.path, &expected, &records);
    if verification.passed() {
        return Ok(());
    }
    Err(TestError::MatchFailure(MatchReport {
        line: step.line,
        target: MatchTarget::Diagnostics,
        command: step.source.clone(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        details: verification.describe(),
        expected: expected.iter().map(ToString::to_string).collect(),
        actual: records.iter().map(ToString::to_string).collect(),
    }))
}
