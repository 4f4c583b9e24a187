//! Failure reports.
//!
//! A report names the stage that failed and the command template, then
//! shows whatever evidence the failure carries: exit status, output
//! excerpts, the failing expectation and a diff of expected vs actual.

use similar::TextDiff;

use crate::error::{MatchReport, StepFailure, TestError};
use crate::result::{TestOutcome, TestResult};

/// Output lines kept from each stream.
const EXCERPT_LINES: usize = 20;

/// Unified diff of expectations against collected output.
pub fn unified_diff(expected: &[String], actual: &[String]) -> String {
    let expected = join_lines(expected);
    let actual = join_lines(actual);
    let diff = TextDiff::from_lines(&expected, &actual);

    let mut result = String::new();
    result.push_str("--- expected\n");
    result.push_str("+++ actual\n");
    for hunk in diff.unified_diff().iter_hunks() {
        result.push_str(&format!("{hunk}"));
    }
    result
}

fn join_lines(lines: &[String]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// The last `EXCERPT_LINES` lines of `text`, indented.
fn excerpt(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let skipped = lines.len().saturating_sub(EXCERPT_LINES);
    let mut out = String::new();
    if skipped > 0 {
        out.push_str(&format!("    ... ({skipped} earlier lines)\n"));
    }
    for line in &lines[skipped..] {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn render_streams(stdout: &str, stderr: &str, out: &mut String) {
    for (name, text) in [("stdout", stdout), ("stderr", stderr)] {
        if !text.trim().is_empty() {
            out.push_str(&format!("  --- {name} ---\n"));
            out.push_str(&excerpt(text));
        }
    }
}

fn render_step(step: &StepFailure, out: &mut String) {
    out.push_str(&format!("  {}: {}\n", step.origin, step.command));
    out.push_str(&format!("  {}\n", step.failure));
    render_streams(&step.stdout, &step.stderr, out);
}

fn render_match(report: &MatchReport, out: &mut String) {
    out.push_str(&format!("  {report}\n"));
    out.push_str(&format!("  command: {}\n", report.command));
    for line in &report.details {
        out.push_str(&format!("  {line}\n"));
    }
    render_streams(&report.stdout, &report.stderr, out);
    if !report.expected.is_empty() || !report.actual.is_empty() {
        for line in unified_diff(&report.expected, &report.actual).lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
}

/// Render the body of a failure report for `error`.
pub fn render_error(error: &TestError) -> String {
    let mut out = String::new();
    match error {
        TestError::BuildFailure(step) | TestError::RuntimeFailure(step) => {
            render_step(step, &mut out);
        }
        TestError::MatchFailure(report) => render_match(report, &mut out),
        TestError::PrerequisiteSkipped(reason) => out.push_str(&format!("  {reason}\n")),
        TestError::HarnessError(err) => out.push_str(&format!("  harness error: {err}\n")),
    }
    out
}

/// Full report for a failed fixture, or `None` if it did not fail.
pub fn render_failure(result: &TestResult) -> Option<String> {
    let TestOutcome::Failed(error) = &result.outcome else {
        return None;
    };
    let stage = result
        .failed_stage
        .map_or_else(String::new, |s| format!(" (stage: {s})"));
    let mut out = format!("FAIL: {}{stage}\n", result.path.display());
    out.push_str(&render_error(error));
    Some(out)
}
