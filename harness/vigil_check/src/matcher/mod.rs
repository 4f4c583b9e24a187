//! The expectation matcher.
//!
//! Walks expectations in declaration order. Sequential anchors share one
//! scan cursor; relative-offset anchors are resolved against each subject's
//! source line instead. The first expectation that fails stops the scan.

use std::fmt;

use regex::{Captures, Regex};
use rustc_hash::FxHashMap;

use crate::{canonicalize_whitespace, Anchor, ExpectationPattern, InstantiateError};

/// Something the matcher can scan: a captured output line, a log event,
/// a diagnostic.
pub trait Subject {
    /// The text patterns are matched against.
    fn text(&self) -> &str;

    /// The source line this subject is attributed to, if any.
    ///
    /// Only consulted by [`Anchor::RelativeOffset`] expectations.
    fn source_line(&self) -> Option<u32> {
        None
    }
}

impl Subject for str {
    fn text(&self) -> &str {
        self
    }
}

impl Subject for String {
    fn text(&self) -> &str {
        self
    }
}

impl<T: Subject + ?Sized> Subject for &T {
    fn text(&self) -> &str {
        (**self).text()
    }

    fn source_line(&self) -> Option<u32> {
        (**self).source_line()
    }
}

/// Matching policy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MatchOptions {
    /// Compare whitespace exactly instead of collapsing runs.
    pub strict_whitespace: bool,
    /// Accept subjects left over after the last expectation.
    pub allow_trailing_output: bool,
}

/// An expectation paired with the subject that satisfied it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Match {
    pub expectation: usize,
    pub subject: usize,
}

/// Why a scan stopped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The subject at the cursor did not match.
    NoMatch,
    /// The output ran out before the expectation could match.
    EndOfOutput,
    /// A `Next` expectation had no previous match to follow.
    NextWithoutPrevious,
    /// A relative offset pointed before the first line.
    LineOutOfRange,
    /// The pattern referenced a variable nothing has bound yet.
    UndefinedVariable(String),
    /// The pattern could not be compiled with its bindings substituted.
    InvalidPattern(String),
    /// Every expectation matched but output was left over.
    UnexpectedOutput,
}

/// Details of the first failure.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatchFailure {
    pub kind: FailureKind,
    /// Index of the failing expectation; `None` for leftover output.
    pub expectation_index: Option<usize>,
    /// Scan position (subject index) when the failure happened.
    pub cursor: usize,
    /// Fixture line of the failing expectation.
    pub annotation_line: Option<u32>,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl MatchFailure {
    /// Human-readable lines describing the failure.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let headline = match &self.kind {
            FailureKind::NoMatch => "expected pattern not found".to_string(),
            FailureKind::EndOfOutput => "expected pattern not found before end of output".to_string(),
            FailureKind::NextWithoutPrevious => {
                "next-line expectation has no previous match".to_string()
            }
            FailureKind::LineOutOfRange => "relative offset points before line 1".to_string(),
            FailureKind::UndefinedVariable(name) => format!("use of undefined variable `{name}`"),
            FailureKind::InvalidPattern(msg) => format!("invalid pattern: {msg}"),
            FailureKind::UnexpectedOutput => "unexpected output after last expectation".to_string(),
        };
        lines.push(headline);
        if let (Some(index), Some(line)) = (self.expectation_index, self.annotation_line) {
            lines.push(format!("  expectation #{index} (fixture line {line})"));
        }
        if let Some(expected) = &self.expected {
            lines.push(format!("  expected: {expected}"));
        }
        lines.push(format!("  scan position: {}", self.cursor));
        match &self.actual {
            Some(actual) => lines.push(format!("  actual:   {actual}")),
            None => lines.push("  actual:   <end of output>".to_string()),
        }
        lines
    }
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe().join("\n"))
    }
}

/// Result of running expectations against a subject sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MatchResult {
    pub success: bool,
    pub first_failure_index: Option<usize>,
    /// Human-readable report lines; empty on success.
    pub diagnostics: Vec<String>,
    /// Satisfied expectations, in order.
    pub matches: Vec<Match>,
    pub failure: Option<MatchFailure>,
}

impl MatchResult {
    fn passed(matches: Vec<Match>) -> Self {
        MatchResult {
            success: true,
            first_failure_index: None,
            diagnostics: Vec::new(),
            matches,
            failure: None,
        }
    }

    #[cold]
    fn failed(matches: Vec<Match>, failure: MatchFailure) -> Self {
        MatchResult {
            success: false,
            first_failure_index: failure.expectation_index,
            diagnostics: failure.describe(),
            matches,
            failure: Some(failure),
        }
    }

    /// The subject index matched by expectation `expectation`, if any.
    pub fn subject_for(&self, expectation: usize) -> Option<usize> {
        self.matches
            .iter()
            .find(|m| m.expectation == expectation)
            .map(|m| m.subject)
    }
}

/// Mutable scan state for one run.
struct Scan {
    cursor: usize,
    last_match: Option<usize>,
    consumed: Vec<bool>,
    vars: FxHashMap<String, String>,
    matches: Vec<Match>,
}

impl Scan {
    fn new(subjects: usize, expectations: usize) -> Self {
        Scan {
            cursor: 0,
            last_match: None,
            consumed: vec![false; subjects],
            vars: FxHashMap::default(),
            matches: Vec::with_capacity(expectations),
        }
    }

    fn next_unconsumed(&self, from: usize) -> usize {
        let mut index = from;
        while self.consumed.get(index).copied().unwrap_or(false) {
            index += 1;
        }
        index
    }

    fn record(
        &mut self,
        expectation: &ExpectationPattern,
        index: usize,
        subject: usize,
        caps: &Captures<'_>,
    ) {
        for name in expectation.pattern.defined_names() {
            if let Some(value) = caps.name(name) {
                self.vars.insert(name.to_string(), value.as_str().to_string());
            }
        }
        self.consumed[subject] = true;
        self.matches.push(Match {
            expectation: index,
            subject,
        });
    }
}

/// Runs expectations against subjects.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    options: MatchOptions,
}

impl Matcher {
    pub fn new(options: MatchOptions) -> Self {
        Matcher { options }
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Match `expectations` against `subjects` in order, failing fast.
    pub fn run<S: Subject>(
        &self,
        expectations: &[ExpectationPattern],
        subjects: &[S],
    ) -> MatchResult {
        self.run_filtered(expectations, subjects, |_, _| true)
    }

    /// Like [`Matcher::run`], but a subject only satisfies expectation `i`
    /// when `accept(i, subject)` also holds.
    pub fn run_filtered<S, F>(
        &self,
        expectations: &[ExpectationPattern],
        subjects: &[S],
        mut accept: F,
    ) -> MatchResult
    where
        S: Subject,
        F: FnMut(usize, &S) -> bool,
    {
        let mut scan = Scan::new(subjects.len(), expectations.len());

        for (index, expectation) in expectations.iter().enumerate() {
            let step = match expectation.anchor {
                Anchor::Exact => {
                    self.match_sequential(index, expectation, subjects, &mut scan, &mut accept)
                }
                Anchor::Next if scan.last_match.is_none() => Err(failure(
                    FailureKind::NextWithoutPrevious,
                    index,
                    expectation,
                    scan.cursor,
                    None,
                )),
                Anchor::Next => {
                    self.match_sequential(index, expectation, subjects, &mut scan, &mut accept)
                }
                Anchor::RelativeOffset(_) => {
                    self.match_relative(index, expectation, subjects, &mut scan, &mut accept)
                }
            };

            if let Err(failure) = step {
                tracing::debug!(
                    expectation = index,
                    cursor = failure.cursor,
                    "expectation failed: {:?}",
                    failure.kind
                );
                return MatchResult::failed(scan.matches, failure);
            }
        }

        if !self.options.allow_trailing_output {
            if let Some(extra) = scan.consumed.iter().position(|consumed| !consumed) {
                return MatchResult::failed(
                    scan.matches,
                    MatchFailure {
                        kind: FailureKind::UnexpectedOutput,
                        expectation_index: None,
                        cursor: extra,
                        annotation_line: None,
                        expected: None,
                        actual: Some(subjects[extra].text().to_string()),
                    },
                );
            }
        }

        MatchResult::passed(scan.matches)
    }

    fn compile(
        &self,
        index: usize,
        expectation: &ExpectationPattern,
        scan: &Scan,
    ) -> Result<Regex, MatchFailure> {
        expectation
            .pattern
            .instantiate(&scan.vars, self.options.strict_whitespace)
            .map_err(|e| {
                let kind = match e {
                    InstantiateError::UndefinedVariable(name) => FailureKind::UndefinedVariable(name),
                    InstantiateError::Regex(msg) => FailureKind::InvalidPattern(msg),
                };
                failure(kind, index, expectation, scan.cursor, None)
            })
    }

    fn subject_text<'a>(&self, subject: &'a impl Subject) -> std::borrow::Cow<'a, str> {
        if self.options.strict_whitespace {
            std::borrow::Cow::Borrowed(subject.text())
        } else {
            canonicalize_whitespace(subject.text())
        }
    }

    fn match_sequential<S, F>(
        &self,
        index: usize,
        expectation: &ExpectationPattern,
        subjects: &[S],
        scan: &mut Scan,
        accept: &mut F,
    ) -> Result<(), MatchFailure>
    where
        S: Subject,
        F: FnMut(usize, &S) -> bool,
    {
        let regex = self.compile(index, expectation, scan)?;
        let cursor = scan.next_unconsumed(scan.cursor);
        let Some(subject) = subjects.get(cursor) else {
            return Err(failure(FailureKind::EndOfOutput, index, expectation, cursor, None));
        };

        let text = self.subject_text(subject);
        if let Some(caps) = regex.captures(&text) {
            if accept(index, subject) {
                scan.record(expectation, index, cursor, &caps);
                scan.last_match = Some(cursor);
                scan.cursor = cursor + 1;
                return Ok(());
            }
        }

        Err(failure(
            FailureKind::NoMatch,
            index,
            expectation,
            cursor,
            Some(subject.text().to_string()),
        ))
    }

    fn match_relative<S, F>(
        &self,
        index: usize,
        expectation: &ExpectationPattern,
        subjects: &[S],
        scan: &mut Scan,
        accept: &mut F,
    ) -> Result<(), MatchFailure>
    where
        S: Subject,
        F: FnMut(usize, &S) -> bool,
    {
        let Some(line) = expectation.target_line() else {
            return Err(failure(FailureKind::LineOutOfRange, index, expectation, scan.cursor, None));
        };
        let regex = self.compile(index, expectation, scan)?;

        let mut first_on_line = None;
        for (position, subject) in subjects.iter().enumerate() {
            if scan.consumed[position] || subject.source_line() != Some(line) {
                continue;
            }
            first_on_line.get_or_insert(position);
            if !accept(index, subject) {
                continue;
            }
            let text = self.subject_text(subject);
            if let Some(caps) = regex.captures(&text) {
                scan.record(expectation, index, position, &caps);
                return Ok(());
            }
        }

        Err(match first_on_line {
            Some(position) => failure(
                FailureKind::NoMatch,
                index,
                expectation,
                position,
                Some(subjects[position].text().to_string()),
            ),
            None => failure(FailureKind::NoMatch, index, expectation, scan.cursor, None),
        })
    }
}

fn failure(
    kind: FailureKind,
    index: usize,
    expectation: &ExpectationPattern,
    cursor: usize,
    actual: Option<String>,
) -> MatchFailure {
    MatchFailure {
        kind,
        expectation_index: Some(index),
        cursor,
        annotation_line: Some(expectation.annotation_line),
        expected: Some(expectation.pattern.as_str().to_string()),
        actual,
    }
}

/// Match with default options: strict adjacency, no trailing output.
pub fn match_lines<S: Subject>(expectations: &[ExpectationPattern], actual: &[S]) -> MatchResult {
    Matcher::default().run(expectations, actual)
}
