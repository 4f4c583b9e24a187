//! Checking collected diagnostics against `expected-*` annotations.

use std::fmt;
use std::path::Path;

use vigil_check::{Anchor, ExpectationPattern, FailureKind, MatchOptions, Matcher, Pattern};

use crate::{DiagnosticRecord, FixIt, Severity};

/// A `{{C1-C2=replacement}}` fix-it expectation, on the diagnostic's line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExpectedFixIt {
    pub start_column: u32,
    pub end_column: u32,
    pub replacement: String,
}

impl ExpectedFixIt {
    pub fn new(start_column: u32, end_column: u32, replacement: impl Into<String>) -> Self {
        ExpectedFixIt {
            start_column,
            end_column,
            replacement: replacement.into(),
        }
    }

    fn matches(&self, line: u32, actual: &FixIt) -> bool {
        actual.is_on_line(line)
            && actual.range_start.column == self.start_column
            && actual.range_end.column == self.end_column
            && actual.replacement == self.replacement
    }
}

impl fmt::Display for ExpectedFixIt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{{{}-{}={}}}}}",
            self.start_column, self.end_column, self.replacement
        )
    }
}

/// What an annotation says about fix-its.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FixItExpectation {
    /// No fix-it clause was written; any fix-its are accepted.
    #[default]
    Unchecked,
    /// `{{none}}`: the diagnostic must carry no fix-its.
    None,
    /// Exactly these fix-its, in order.
    Exact(Vec<ExpectedFixIt>),
}

/// A parsed `expected-<severity>[@anchor] {{message}}` annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedDiagnostic {
    pub severity: Severity,
    /// Message pattern, anchored by relative offset from the annotation.
    pub expectation: ExpectationPattern,
    /// Column from an `@-1:5` style anchor.
    pub column: Option<u32>,
    pub fix_its: FixItExpectation,
}

impl ExpectedDiagnostic {
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        annotation_line: u32,
        offset: i32,
    ) -> Self {
        ExpectedDiagnostic {
            severity,
            expectation: ExpectationPattern::new(
                Anchor::RelativeOffset(offset),
                Pattern::literal(message),
                annotation_line,
            ),
            column: None,
            fix_its: FixItExpectation::Unchecked,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    #[must_use]
    pub fn with_fix_its(mut self, fix_its: FixItExpectation) -> Self {
        self.fix_its = fix_its;
        self
    }

    /// The line the diagnostic must be reported on.
    pub fn target_line(&self) -> Option<u32> {
        self.expectation.target_line()
    }

    pub fn message(&self) -> &str {
        self.expectation.pattern.as_str()
    }

    fn accepts(&self, record: &DiagnosticRecord) -> bool {
        record.severity == self.severity
            && self.column.map_or(true, |column| record.column == Some(column))
    }

    fn check_fix_its(&self, record: &DiagnosticRecord) -> bool {
        match &self.fix_its {
            FixItExpectation::Unchecked => true,
            FixItExpectation::None => record.fix_its.is_empty(),
            FixItExpectation::Exact(expected) => {
                expected.len() == record.fix_its.len()
                    && expected
                        .iter()
                        .zip(&record.fix_its)
                        .all(|(e, a)| e.matches(record.line, a))
            }
        }
    }
}

impl fmt::Display for ExpectedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_line() {
            Some(line) => write!(f, "{} on line {line}", self.severity)?,
            None => write!(f, "{} (line out of range)", self.severity)?,
        }
        if let Some(column) = self.column {
            write!(f, ":{column}")?;
        }
        write!(f, ": {}", self.message())
    }
}

/// One reason verification failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyProblem {
    /// An annotation found no matching diagnostic.
    Missing {
        index: usize,
        expected: ExpectedDiagnostic,
        /// The first diagnostic reported on the target line, if any.
        nearest: Option<DiagnosticRecord>,
    },
    /// A diagnostic no annotation accounts for.
    Unexpected { record: DiagnosticRecord },
    /// The diagnostic matched but its fix-its did not.
    FixItMismatch {
        index: usize,
        expected: ExpectedDiagnostic,
        actual: Vec<FixIt>,
    },
}

impl fmt::Display for VerifyProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyProblem::Missing {
                expected, nearest, ..
            } => {
                write!(
                    f,
                    "fixture line {}: expected {expected} was not produced",
                    expected.expectation.annotation_line
                )?;
                if let Some(nearest) = nearest {
                    write!(f, "\n  nearest: {nearest}")?;
                }
                Ok(())
            }
            VerifyProblem::Unexpected { record } => write!(f, "unexpected diagnostic: {record}"),
            VerifyProblem::FixItMismatch {
                expected, actual, ..
            } => {
                write!(
                    f,
                    "fixture line {}: fix-its for {expected} differ\n  expected:",
                    expected.expectation.annotation_line
                )?;
                match &expected.fix_its {
                    FixItExpectation::Exact(fix_its) => {
                        for fix_it in fix_its {
                            write!(f, " {fix_it}")?;
                        }
                    }
                    FixItExpectation::None | FixItExpectation::Unchecked => {
                        write!(f, " {{{{none}}}}")?;
                    }
                }
                write!(f, "\n  actual:  ")?;
                if actual.is_empty() {
                    write!(f, " {{{{none}}}}")?;
                }
                for fix_it in actual {
                    write!(f, " {fix_it}")?;
                }
                Ok(())
            }
        }
    }
}

/// Outcome of verifying one diagnostic stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    /// `(expectation index, record index)` pairs that matched.
    pub matched: Vec<(usize, usize)>,
    pub problems: Vec<VerifyProblem>,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.problems.is_empty()
    }

    /// Index of the first expectation that failed.
    pub fn first_failure_index(&self) -> Option<usize> {
        self.problems.iter().find_map(|problem| match problem {
            VerifyProblem::Missing { index, .. } | VerifyProblem::FixItMismatch { index, .. } => {
                Some(*index)
            }
            VerifyProblem::Unexpected { .. } => None,
        })
    }

    /// Report lines, one per problem.
    pub fn describe(&self) -> Vec<String> {
        self.problems.iter().map(ToString::to_string).collect()
    }
}

/// Verify `actual` diagnostics against the `expected` annotations of the
/// fixture at `fixture`.
///
/// Every annotation must match a distinct diagnostic of the same severity
/// reported in the fixture file on its target line whose message contains
/// the annotation text. Diagnostics from other files never satisfy an
/// annotation. Scanning stops at the first annotation that cannot be
/// satisfied. When all annotations match, every leftover diagnostic
/// (including those from other files) is reported as unexpected, then
/// fix-its are compared.
pub fn verify(
    fixture: &Path,
    expected: &[ExpectedDiagnostic],
    actual: &[DiagnosticRecord],
) -> Verification {
    let expectations: Vec<ExpectationPattern> =
        expected.iter().map(|e| e.expectation.clone()).collect();
    let matcher = Matcher::new(MatchOptions {
        strict_whitespace: false,
        allow_trailing_output: true,
    });
    let result = matcher.run_filtered(&expectations, actual, |index, record| {
        expected[index].accepts(record) && record.is_in_file(fixture)
    });

    let matched: Vec<(usize, usize)> = result
        .matches
        .iter()
        .map(|m| (m.expectation, m.subject))
        .collect();
    let mut verification = Verification {
        matched,
        problems: Vec::new(),
    };

    if let Some(failure) = &result.failure {
        if let Some(index) = failure.expectation_index {
            let nearest = if failure.kind == FailureKind::NoMatch && failure.actual.is_some() {
                actual.get(failure.cursor).cloned()
            } else {
                None
            };
            tracing::debug!(expectation = index, "expected diagnostic missing");
            verification.problems.push(VerifyProblem::Missing {
                index,
                expected: expected[index].clone(),
                nearest,
            });
            return verification;
        }
    }

    let mut consumed = vec![false; actual.len()];
    for &(_, record) in &verification.matched {
        consumed[record] = true;
    }
    for (record, _) in actual.iter().zip(&consumed).filter(|(_, used)| !**used) {
        verification.problems.push(VerifyProblem::Unexpected {
            record: record.clone(),
        });
    }

    for &(index, record) in &verification.matched {
        let record = &actual[record];
        if !expected[index].check_fix_its(record) {
            verification.problems.push(VerifyProblem::FixItMismatch {
                index,
                expected: expected[index].clone(),
                actual: record.fix_its.clone(),
            });
        }
    }

    verification
}
