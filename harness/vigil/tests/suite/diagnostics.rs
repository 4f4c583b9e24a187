//! `-verify` fixtures.

use vigil::{TestError, TestStage};
use vigil_diagnostic::VerifyProblem;

use crate::common::{FakeSuite, APPLICATION_MAIN_FIXTURE, FAKE_FRONTEND, FRONTEND_CONFIG};

#[test]
fn application_main_verifies() {
    let (suite, fixture) = FakeSuite::application_main();
    let summary = suite.run(&fixture);
    assert_eq!(summary.passed, 1, "{:?}", summary.results);
    assert_eq!(summary.results[0].stage, TestStage::Passed);
}

#[test]
fn wrong_fix_it_fails_verification() {
    let suite = FakeSuite::new(FRONTEND_CONFIG);
    let fixture = suite.write(
        "attr/multiple.swift",
        &APPLICATION_MAIN_FIXTURE.replacen("{{1-19=@main}}", "{{1-18=@main}}", 1),
    );
    let summary = suite.run(&fixture);

    let Some(TestError::MatchFailure(report)) = summary.results[0].error() else {
        panic!("expected match failure, got {:?}", summary.results[0].outcome);
    };
    assert!(report.details.iter().any(|d| d.contains("fix-it")), "{:?}", report.details);
}

#[test]
fn extra_annotation_reports_missing_diagnostic() {
    let suite = FakeSuite::new(FRONTEND_CONFIG);
    let text = APPLICATION_MAIN_FIXTURE.replace(
        "class MyDelegate3",
        "// expected-remark@-3 {{never emitted}}\nclass MyDelegate3",
    );
    let fixture = suite.write("attr/multiple.swift", &text);
    let summary = suite.run(&fixture);

    let result = &summary.results[0];
    assert_eq!(result.failed_stage, Some(TestStage::Matching));
    assert!(matches!(result.error(), Some(TestError::MatchFailure(_))));

    let records = vigil_diagnostic::collect(
        "multiple.swift:7:1: error: 'UIApplicationMain' attribute can only apply to one class in a module\n",
    )
    .unwrap();
    let fixture = vigil_fixture::Fixture::parse("multiple.swift", &text, &Default::default()).unwrap();
    let verification = vigil_diagnostic::verify(&fixture.path, &fixture.expected_diagnostics(), &records);
    assert!(matches!(verification.problems[0], VerifyProblem::Missing { .. }));
}

#[test]
fn diagnostics_from_another_file_do_not_verify() {
    let (suite, fixture) = FakeSuite::application_main();
    suite.write(
        "tools/fake-frontend.sh",
        &FAKE_FRONTEND.replace("echo \"$file:", "echo \"SomeHeader.h:"),
    );
    let summary = suite.run(&fixture);

    let result = &summary.results[0];
    assert_eq!(result.failed_stage, Some(TestStage::Matching));
    let Some(TestError::MatchFailure(report)) = result.error() else {
        panic!("expected match failure, got {:?}", result.outcome);
    };
    assert!(
        report.details.iter().any(|d| d.contains("was not produced")),
        "{:?}",
        report.details
    );
}

#[test]
fn unsupported_host_skips() {
    let suite = FakeSuite::new(FRONTEND_CONFIG);
    let fixture = suite.write(
        "attr/multiple.swift",
        &format!("// UNSUPPORTED: {}\n{APPLICATION_MAIN_FIXTURE}", std::env::consts::OS),
    );
    let summary = suite.run(&fixture);
    assert_eq!(summary.skipped, 1);
}
