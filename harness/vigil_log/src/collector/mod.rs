//! Splitting a process's stdout into log events.

use std::io::{BufRead, BufReader, Read};

use crate::{LogEvent, LogEventKind, SourceRange};

/// Errors reading an instrumentation stream.
///
/// These are harness errors: the captured output is malformed, which is
/// different from output that fails to match expectations.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("output ended mid-line after {complete} complete lines (partial line {partial:?})")]
    TruncatedLine { complete: usize, partial: String },
    #[error("output line {line} is not valid UTF-8")]
    InvalidUtf8 { line: usize },
    #[error("failed to read output: {0}")]
    Io(#[from] std::io::Error),
}

/// Tag spellings the runtime uses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogTags {
    pub scope_entry: String,
    pub scope_exit: String,
    /// Prefix of a value record; the payload follows in `[...]`.
    pub value_log: String,
}

impl Default for LogTags {
    fn default() -> Self {
        LogTags {
            scope_entry: "__builtin_log_scope_entry".to_string(),
            scope_exit: "__builtin_log_scope_exit".to_string(),
            value_log: "__builtin_log".to_string(),
        }
    }
}

/// Reads a stream line by line and classifies each line.
#[derive(Clone, Debug, Default)]
pub struct LogCollector {
    tags: LogTags,
}

impl LogCollector {
    pub fn new(tags: LogTags) -> Self {
        LogCollector { tags }
    }

    /// Collect every line of `reader`.
    ///
    /// The stream must end with a newline (or be empty); a trailing partial
    /// line is [`CollectError::TruncatedLine`].
    pub fn collect<R: Read>(&self, reader: R) -> Result<Vec<LogEvent>, CollectError> {
        let mut reader = BufReader::new(reader);
        let mut events = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            if buf.last() != Some(&b'\n') {
                tracing::debug!(complete = events.len(), "instrumentation stream truncated");
                return Err(CollectError::TruncatedLine {
                    complete: events.len(),
                    partial: String::from_utf8_lossy(&buf).into_owned(),
                });
            }
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }

            let line = std::str::from_utf8(&buf)
                .map_err(|_| CollectError::InvalidUtf8 {
                    line: events.len() + 1,
                })?;
            events.push(self.classify(line, events.len()));
        }

        Ok(events)
    }

    /// Classify a single line (without its delimiter).
    pub fn classify(&self, line: &str, sequence_index: usize) -> LogEvent {
        let (range, body) = split_range(line);
        let (kind, payload) = self.match_tag(body);

        LogEvent {
            kind,
            payload: payload.to_string(),
            range,
            text: line.to_string(),
            sequence_index,
        }
    }

    fn match_tag<'a>(&self, body: &'a str) -> (Option<LogEventKind>, &'a str) {
        if body == self.tags.scope_entry {
            return (Some(LogEventKind::ScopeEntry), "");
        }
        if body == self.tags.scope_exit {
            return (Some(LogEventKind::ScopeExit), "");
        }
        let payload = body
            .strip_prefix(self.tags.value_log.as_str())
            .and_then(|rest| rest.strip_prefix('['))
            .and_then(|rest| rest.strip_suffix(']'));
        match payload {
            Some(payload) => (Some(LogEventKind::ValueLog), payload),
            None => (None, body),
        }
    }
}

/// Split an optional leading `[L:C-L:C] ` from a line.
fn split_range(line: &str) -> (Option<SourceRange>, &str) {
    let parsed = line.strip_prefix('[').and_then(|rest| {
        let (inner, after) = rest.split_once(']')?;
        let range = SourceRange::parse(inner)?;
        Some((range, after.strip_prefix(' ').unwrap_or(after)))
    });
    match parsed {
        Some((range, body)) => (Some(range), body),
        None => (None, line),
    }
}

/// Collect with the default tag set.
pub fn collect<R: Read>(reader: R) -> Result<Vec<LogEvent>, CollectError> {
    LogCollector::default().collect(reader)
}

/// Collect from an in-memory capture.
pub fn collect_bytes(bytes: &[u8]) -> Result<Vec<LogEvent>, CollectError> {
    collect(bytes)
}
