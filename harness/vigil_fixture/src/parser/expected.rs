//! `expected-<severity>[@anchor] {{message}} {{fix-its}}` annotations.

use std::sync::OnceLock;

use regex::Regex;
use vigil_check::resolve_relative;
use vigil_diagnostic::{ExpectedDiagnostic, ExpectedFixIt, FixItExpectation, Severity};

use crate::FixtureError;

#[expect(clippy::expect_used, reason = "constant pattern")]
fn annotation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"expected-(?P<sev>error|warning|note|remark)(?:@(?P<anchor>[^\s{]*))?")
            .expect("annotation regex is valid")
    })
}

#[expect(clippy::expect_used, reason = "constant pattern")]
fn fix_it_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?s)(?P<start>\d+)-(?P<end>\d+)=(?P<text>.*)$").expect("fix-it regex is valid")
    })
}

/// Every annotation on one fixture line.
pub(super) fn parse_line(
    text: &str,
    line: u32,
    line_count: u32,
) -> Result<Vec<ExpectedDiagnostic>, FixtureError> {
    let mut found = Vec::new();
    let mut search = 0;

    while let Some(caps) = annotation_regex().captures_at(text, search) {
        let Some(whole) = caps.get(0) else { break };
        let severity_word = &caps["sev"];
        let severity = Severity::parse(severity_word).unwrap_or(Severity::Error);
        let (offset, column) = match caps.name("anchor") {
            Some(anchor) => parse_anchor(anchor.as_str(), line, line_count)?,
            None => (0, None),
        };

        let mut rest = &text[whole.end()..];
        let Some((message, after)) = next_block(rest) else {
            return Err(if rest.trim_start().starts_with("{{") {
                FixtureError::UnterminatedMessage {
                    line,
                    severity: severity_word.to_string(),
                }
            } else {
                FixtureError::MissingMessage {
                    line,
                    severity: severity_word.to_string(),
                }
            });
        };
        rest = after;

        let mut fix_its = FixItExpectation::Unchecked;
        while let Some((clause, after)) = next_block(rest) {
            rest = after;
            fix_its = add_fix_it(fix_its, clause, line)?;
        }

        let mut expected = ExpectedDiagnostic::new(severity, message, line, offset).with_fix_its(fix_its);
        if let Some(column) = column {
            expected = expected.with_column(column);
        }
        found.push(expected);
        search = text.len() - rest.len();
    }

    Ok(found)
}

/// Split a leading `{{...}}` block off `text`, skipping whitespace before it.
fn next_block(text: &str) -> Option<(&str, &str)> {
    let body = text.trim_start().strip_prefix("{{")?;
    let close = body.find("}}")?;
    Some((&body[..close], &body[close + 2..]))
}

fn add_fix_it(
    current: FixItExpectation,
    clause: &str,
    line: u32,
) -> Result<FixItExpectation, FixtureError> {
    if clause == "none" {
        return Ok(FixItExpectation::None);
    }
    let malformed = || FixtureError::MalformedFixIt {
        line,
        text: clause.to_string(),
    };
    let caps = fix_it_regex().captures(clause).ok_or_else(malformed)?;
    let start_column = caps["start"].parse().map_err(|_| malformed())?;
    let end_column = caps["end"].parse().map_err(|_| malformed())?;
    let fix_it = ExpectedFixIt::new(start_column, end_column, &caps["text"]);

    Ok(match current {
        FixItExpectation::Exact(mut fix_its) => {
            fix_its.push(fix_it);
            FixItExpectation::Exact(fix_its)
        }
        FixItExpectation::Unchecked | FixItExpectation::None => {
            FixItExpectation::Exact(vec![fix_it])
        }
    })
}

/// Parse the text after `@`: `-N`, `+N`, `N`, with an optional `:C`.
///
/// Returns the relative line offset and the column.
fn parse_anchor(
    anchor: &str,
    line: u32,
    line_count: u32,
) -> Result<(i32, Option<u32>), FixtureError> {
    let malformed = || FixtureError::MalformedAnchor {
        line,
        anchor: anchor.to_string(),
    };
    let (line_part, column_part) = match anchor.split_once(':') {
        Some((l, c)) => (l, Some(c)),
        None => (anchor, None),
    };

    let offset = if line_part.is_empty() {
        0
    } else if line_part.starts_with(['+', '-']) {
        line_part
            .trim_start_matches('+')
            .parse::<i32>()
            .map_err(|_| malformed())?
    } else {
        let absolute: i64 = line_part.parse().map_err(|_| malformed())?;
        i32::try_from(absolute - i64::from(line)).map_err(|_| malformed())?
    };

    let column = match column_part {
        Some(c) => Some(c.parse::<u32>().ok().filter(|c| *c >= 1).ok_or_else(malformed)?),
        None => None,
    };

    match resolve_relative(line, offset) {
        Some(target) if target <= line_count => Ok((offset, column)),
        _ => Err(FixtureError::OffsetOutOfRange {
            line,
            anchor: anchor.to_string(),
        }),
    }
}
