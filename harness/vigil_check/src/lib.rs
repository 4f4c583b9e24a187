//! Expectation matching for the Vigil test harness.
//!
//! Fixtures embed expectations as comments (`CHECK:`, `CHECK-NEXT:`,
//! `expected-error@-1 {{...}}`). Each one becomes an [`ExpectationPattern`]:
//! a [`Pattern`] plus an [`Anchor`] saying where in the captured output it
//! must match. The [`Matcher`] walks the expectations in declaration order
//! against anything implementing [`Subject`] and stops at the first miss.
//!
//! ```text
//! expectations ──► Matcher::run(subjects) ──► MatchResult
//!                        │
//!            Exact / Next: sequential cursor
//!            RelativeOffset: keyed by source line
//! ```

mod anchor;
mod matcher;
mod pattern;

pub use anchor::{resolve_relative, Anchor, ExpectationPattern};
pub use matcher::{
    match_lines, FailureKind, Match, MatchFailure, MatchOptions, MatchResult, Matcher, Subject,
};
pub use pattern::{canonicalize_whitespace, InstantiateError, Pattern, PatternError, Segment};
