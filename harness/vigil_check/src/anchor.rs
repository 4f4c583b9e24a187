//! Expectation anchors.

use std::fmt;

use crate::Pattern;

/// Where an expectation must match relative to the scan.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Anchor {
    /// Match at the current scan cursor (`CHECK:`).
    Exact,
    /// Match on the line right after the previous match (`CHECK-NEXT:`).
    Next,
    /// Match a subject attributed to `annotation_line + n` (`@-1`, `@+2`).
    ///
    /// Independent of scan order; does not move the cursor.
    RelativeOffset(i32),
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Exact => write!(f, "exact"),
            Anchor::Next => write!(f, "next"),
            Anchor::RelativeOffset(0) => write!(f, "@+0"),
            Anchor::RelativeOffset(n) if *n > 0 => write!(f, "@+{n}"),
            Anchor::RelativeOffset(n) => write!(f, "@{n}"),
        }
    }
}

/// A single parsed expectation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectationPattern {
    pub anchor: Anchor,
    pub pattern: Pattern,
    /// 1-based physical line of the comment that declared this expectation.
    pub annotation_line: u32,
}

impl ExpectationPattern {
    pub fn new(anchor: Anchor, pattern: Pattern, annotation_line: u32) -> Self {
        ExpectationPattern {
            anchor,
            pattern,
            annotation_line,
        }
    }

    /// The source line a relative-offset expectation points at.
    ///
    /// Returns `None` for sequential anchors, or when the offset lands
    /// before line 1.
    pub fn target_line(&self) -> Option<u32> {
        match self.anchor {
            Anchor::RelativeOffset(offset) => resolve_relative(self.annotation_line, offset),
            Anchor::Exact | Anchor::Next => None,
        }
    }
}

/// Resolve `@offset` written on `annotation_line` to an absolute 1-based line.
///
/// Pure: the result depends only on its arguments, never on scan state.
pub fn resolve_relative(annotation_line: u32, offset: i32) -> Option<u32> {
    let line = i64::from(annotation_line) + i64::from(offset);
    u32::try_from(line).ok().filter(|line| *line >= 1)
}
