//! Parsing compiler output into diagnostic records.
//!
//! Two line shapes are recognized:
//!
//! - `path:line:col: severity: message` (or `path:line: severity: message`)
//! - `fix-it:"path":{L1:C1-L2:C2}:"replacement"`, clang's parseable fix-it
//!   form, attached to the most recent diagnostic
//!
//! Anything else (source excerpts, caret lines, summaries) is ignored.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::{DiagnosticRecord, FixIt, Position, Severity};

/// Errors normalizing diagnostic output.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CollectError {
    #[error("fix-it on output line {line} has no preceding diagnostic")]
    OrphanFixIt { line: usize },
    #[error("malformed fix-it on output line {line}: {text}")]
    MalformedFixIt { line: usize, text: String },
    #[error("number out of range on output line {line}: {text}")]
    NumberOutOfRange { line: usize, text: String },
}

#[expect(clippy::expect_used, reason = "constant pattern")]
fn diagnostic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<file>.*?):(?P<line>\d+):(?:(?P<col>\d+):)? (?P<sev>error|warning|note|remark): (?P<msg>.*)$",
        )
        .expect("diagnostic regex is valid")
    })
}

#[expect(clippy::expect_used, reason = "constant pattern")]
fn fix_it_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^fix-it:"(?:[^"\\]|\\.)*":\{(?P<l1>\d+):(?P<c1>\d+)-(?P<l2>\d+):(?P<c2>\d+)\}:"(?P<text>(?:[^"\\]|\\.)*)"$"#,
        )
        .expect("fix-it regex is valid")
    })
}

/// Normalize captured diagnostic output, preserving emission order.
pub fn collect(output: &str) -> Result<Vec<DiagnosticRecord>, CollectError> {
    let mut records: Vec<DiagnosticRecord> = Vec::new();

    for (index, raw) in output.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end_matches('\r');

        if line.starts_with("fix-it:") {
            let Some(caps) = fix_it_regex().captures(line) else {
                return Err(CollectError::MalformedFixIt {
                    line: line_no,
                    text: line.to_string(),
                });
            };
            let fix_it = parse_fix_it(&caps, line_no)?;
            let Some(parent) = records.last_mut() else {
                return Err(CollectError::OrphanFixIt { line: line_no });
            };
            parent.fix_its.push(fix_it);
            continue;
        }

        if let Some(caps) = diagnostic_regex().captures(line) {
            records.push(parse_diagnostic(&caps, line_no)?);
        }
    }

    tracing::debug!(count = records.len(), "collected diagnostics");
    Ok(records)
}

fn parse_diagnostic(caps: &Captures<'_>, line_no: usize) -> Result<DiagnosticRecord, CollectError> {
    let severity = Severity::parse(&caps["sev"]).unwrap_or(Severity::Error);
    let line = number(&caps["line"], line_no)?;
    let column = caps
        .name("col")
        .map(|m| number(m.as_str(), line_no))
        .transpose()?;
    Ok(DiagnosticRecord::new(
        severity,
        &caps["file"],
        line,
        column,
        &caps["msg"],
    ))
}

fn parse_fix_it(caps: &Captures<'_>, line_no: usize) -> Result<FixIt, CollectError> {
    let start = Position::new(number(&caps["l1"], line_no)?, number(&caps["c1"], line_no)?);
    let end = Position::new(number(&caps["l2"], line_no)?, number(&caps["c2"], line_no)?);
    Ok(FixIt::new(start, end, unescape(&caps["text"])))
}

fn number(text: &str, line_no: usize) -> Result<u32, CollectError> {
    text.parse().map_err(|_| CollectError::NumberOutOfRange {
        line: line_no,
        text: text.to_string(),
    })
}

/// Undo the escaping of a quoted fix-it string.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other @ ('\\' | '"')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
