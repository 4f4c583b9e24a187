//! `RUN:` line parsing.

use std::sync::OnceLock;

use regex::Regex;

use super::{ParseOptions, DEFAULT_CHECK_PREFIX};
use crate::{FixtureError, RunStep, Sink, Stage};

/// The text after `RUN:` if `text` is a RUN line.
pub(super) fn run_content(text: &str) -> Option<&str> {
    let mut search = 0;
    while let Some(found) = text[search..].find("RUN:") {
        let start = search + found;
        let boundary = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '-'));
        if boundary {
            return Some(&text[start + "RUN:".len()..]);
        }
        search = start + "RUN:".len();
    }
    None
}

#[expect(clippy::expect_used, reason = "constant pattern")]
fn check_pipe_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<cmd>.*?)\s*\|\s*%FileCheck\s+%s(?P<args>(?:\s+\S+)*)\s*$")
            .expect("check pipe regex is valid")
    })
}

/// Join continuation lines and classify each RUN step.
pub(super) fn parse_steps(
    lines: &[&str],
    options: &ParseOptions,
) -> Result<Vec<RunStep>, FixtureError> {
    let mut steps = Vec::new();
    let mut pending: Option<(u32, String)> = None;
    let mut last_run_line = 0;

    for (index, text) in lines.iter().enumerate() {
        let line = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let Some(content) = run_content(text) else {
            continue;
        };
        last_run_line = line;
        let content = content.trim();
        let (piece, continues) = match content.strip_suffix('\\') {
            Some(head) => (head.trim_end(), true),
            None => (content, false),
        };

        let (first_line, mut command) = pending.take().unwrap_or((line, String::new()));
        if !command.is_empty() && !piece.is_empty() {
            command.push(' ');
        }
        command.push_str(piece);

        if continues {
            pending = Some((first_line, command));
        } else {
            steps.push(classify(first_line, &command, options)?);
        }
    }

    if pending.is_some() {
        return Err(FixtureError::UnterminatedContinuation {
            line: last_run_line,
        });
    }
    Ok(steps)
}

fn classify(line: u32, source: &str, options: &ParseOptions) -> Result<RunStep, FixtureError> {
    let (expect_failure, mut command) = match source.strip_prefix("not ") {
        Some(rest) => (true, rest.trim_start().to_string()),
        None => (false, source.to_string()),
    };

    let mut sink = Sink::None;
    if let Some(caps) = check_pipe_regex().captures(&command) {
        let mut prefix = DEFAULT_CHECK_PREFIX.to_string();
        for option in caps["args"].split_whitespace() {
            match option
                .strip_prefix("--check-prefix=")
                .or_else(|| option.strip_prefix("-check-prefix="))
            {
                Some(value) if !value.is_empty() => prefix = value.to_string(),
                _ => {
                    return Err(FixtureError::UnsupportedCheckOption {
                        line,
                        option: option.to_string(),
                    })
                }
            }
        }
        command = caps["cmd"].to_string();
        sink = Sink::CheckOutput { prefix };
    }

    if let Some(stripped) = strip_flag(&command, &options.verify_flag) {
        command = stripped;
        sink = Sink::VerifyDiagnostics;
    }

    let stage = if command.contains("%target-run") || matches!(sink, Sink::CheckOutput { .. }) {
        Stage::Run
    } else {
        Stage::Build
    };

    Ok(RunStep {
        line,
        command,
        source: source.to_string(),
        sink,
        stage,
        expect_failure,
    })
}

/// Remove `flag` where it appears as a whole word, with one adjacent space.
fn strip_flag(command: &str, flag: &str) -> Option<String> {
    if flag.is_empty() {
        return None;
    }
    let mut search = 0;
    while let Some(found) = command[search..].find(flag) {
        let start = search + found;
        let end = start + flag.len();
        let before_ok = command[..start]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        let after_ok = command[end..].chars().next().map_or(true, char::is_whitespace);
        if before_ok && after_ok {
            let head = command[..start].trim_end();
            let tail = command[end..].trim_start();
            let mut out = head.to_string();
            if !head.is_empty() && !tail.is_empty() {
                out.push(' ');
            }
            out.push_str(tail);
            return Some(out);
        }
        search = end;
    }
    None
}
