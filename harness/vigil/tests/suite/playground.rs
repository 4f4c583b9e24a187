//! Instrumentation log fixtures: build, run, `FileCheck`.

use vigil::error::MatchTarget;
use vigil::{HarnessError, TestError, TestOutcome, TestStage};

use crate::common::{FakeSuite, PLAYGROUND_LOG};

#[test]
fn playground_log_matches_checks() {
    let (suite, fixture) = FakeSuite::playground(PLAYGROUND_LOG);
    let summary = suite.run(&fixture);

    assert_eq!(summary.passed, 1, "{:?}", summary.results);
    let result = &summary.results[0];
    assert_eq!(result.stage, TestStage::Passed);
    // Both instrumented binaries are matched.
    let runs = result.log.iter().filter(|e| e.contains("%FileCheck")).count();
    assert_eq!(runs, 2);
}

#[test]
fn truncated_log_is_harness_error() {
    let truncated = PLAYGROUND_LOG
        .strip_suffix("[17:1-17:10] __builtin_log[='7']\n")
        .map(|head| format!("{head}[17:1-17:10] __builtin_log[="))
        .unwrap();
    let (suite, fixture) = FakeSuite::playground(&truncated);
    let summary = suite.run(&fixture);

    assert_eq!(summary.failed, 1);
    let result = &summary.results[0];
    assert!(
        matches!(
            result.error(),
            Some(TestError::HarnessError(HarnessError::Log(
                vigil_log::CollectError::TruncatedLine { .. }
            )))
        ),
        "{:?}",
        result.outcome
    );
}

#[test]
fn wrong_value_is_match_failure() {
    let (suite, fixture) = FakeSuite::playground(&PLAYGROUND_LOG.replace("[='7']", "[='8']"));
    let summary = suite.run(&fixture);

    let result = &summary.results[0];
    assert_eq!(result.failed_stage, Some(TestStage::Matching));
    let Some(TestError::MatchFailure(report)) = result.error() else {
        panic!("expected match failure, got {:?}", result.outcome);
    };
    assert_eq!(report.line, 6);
    assert_eq!(
        report.target,
        MatchTarget::Checks {
            prefix: "CHECK".to_string()
        }
    );
    assert!(report.details.iter().any(|d| d.contains("__builtin_log[='8']")));
}

#[test]
fn missing_feature_skips_playground() {
    let suite = FakeSuite::new("features = []\n");
    let fixture = suite.write("playground.swift", crate::common::PLAYGROUND_FIXTURE);
    let summary = suite.run(&fixture);
    assert!(matches!(
        &summary.results[0].outcome,
        TestOutcome::Skipped(reason) if reason == "missing feature: executable_test"
    ));
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn same_fixture_twice_is_idempotent() {
    let (suite, fixture) = FakeSuite::playground(PLAYGROUND_LOG);
    let runner = suite.runner(vigil::TestRunnerConfig::default());
    let first = runner.run(&fixture);
    let second = runner.run(&fixture);

    let first = &first.results[0];
    let second = &second.results[0];
    assert_eq!(first.outcome.label(), second.outcome.label());
    assert_eq!(first.log, second.log);

    let failing = PLAYGROUND_LOG.replace("lhs='3'", "lhs='4'");
    suite.write("tools/playground.log", &failing);
    let a = runner.run(&fixture);
    let b = runner.run(&fixture);
    assert_eq!(a.results[0].outcome.label(), "FAIL");
    assert_eq!(a.results[0].log, b.results[0].log);
    let (Some(TestError::MatchFailure(x)), Some(TestError::MatchFailure(y))) =
        (a.results[0].error(), b.results[0].error())
    else {
        panic!("expected match failures");
    };
    assert_eq!(x, y);
}
