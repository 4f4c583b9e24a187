//! Log event types.

use std::fmt;

use vigil_check::Subject;

/// Kind of a recognized log record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LogEventKind {
    ScopeEntry,
    ScopeExit,
    ValueLog,
}

impl fmt::Display for LogEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEventKind::ScopeEntry => write!(f, "scope-entry"),
            LogEventKind::ScopeExit => write!(f, "scope-exit"),
            LogEventKind::ValueLog => write!(f, "value"),
        }
    }
}

/// The `[L:C-L:C]` source range a runtime prefixes each record with.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SourceRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceRange {
    /// Parse `15:54-17:2` (without brackets).
    pub fn parse(text: &str) -> Option<Self> {
        let (start, end) = text.split_once('-')?;
        let (start_line, start_column) = parse_position(start)?;
        let (end_line, end_column) = parse_position(end)?;
        Some(SourceRange {
            start_line,
            start_column,
            end_line,
            end_column,
        })
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

fn parse_position(text: &str) -> Option<(u32, u32)> {
    let (line, column) = text.split_once(':')?;
    Some((line.parse().ok()?, column.parse().ok()?))
}

/// One line of instrumentation output.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct LogEvent {
    /// `None` for lines without a recognized tag.
    pub kind: Option<LogEventKind>,
    /// Bytes after the tag, verbatim (`lhs='3'` for `__builtin_log[lhs='3']`).
    pub payload: String,
    pub range: Option<SourceRange>,
    /// The full captured line, without its delimiter.
    pub text: String,
    /// Position in the stream, starting at 0.
    pub sequence_index: usize,
}

impl LogEvent {
    pub fn is_opaque(&self) -> bool {
        self.kind.is_none()
    }
}

impl Subject for LogEvent {
    fn text(&self) -> &str {
        &self.text
    }

    fn source_line(&self) -> Option<u32> {
        self.range.map(|range| range.start_line)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
