//! Line-oriented directive parser.

mod expected;
mod run;

use std::sync::OnceLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use vigil_check::{Anchor, ExpectationPattern, Pattern};

use crate::{Annotated, Directive, FixtureError, Requirement, Sink};

pub const DEFAULT_CHECK_PREFIX: &str = "CHECK";
pub const DEFAULT_VERIFY_FLAG: &str = "-verify";

/// Knobs for directive recognition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Flag that marks a step as diagnostic-verifying; stripped from the
    /// command before it runs.
    pub verify_flag: String,
    /// Check prefixes recognized in addition to `CHECK` and those named by
    /// `--check-prefix` in RUN lines.
    pub check_prefixes: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            verify_flag: DEFAULT_VERIFY_FLAG.to_string(),
            check_prefixes: Vec::new(),
        }
    }
}

/// Parse every directive in `source`, in line order.
pub fn parse(source: &str, options: &ParseOptions) -> Result<Vec<Annotated>, FixtureError> {
    let lines: Vec<&str> = source.lines().collect();
    let line_count = u32::try_from(lines.len()).unwrap_or(u32::MAX);

    // RUN lines first: their --check-prefix options decide which check
    // prefixes exist.
    let steps = run::parse_steps(&lines, options)?;
    let mut prefixes: Vec<String> = vec![DEFAULT_CHECK_PREFIX.to_string()];
    let named = steps.iter().filter_map(|step| match &step.sink {
        Sink::CheckOutput { prefix } => Some(prefix),
        Sink::None | Sink::VerifyDiagnostics => None,
    });
    for prefix in options.check_prefixes.iter().chain(named) {
        if !prefixes.contains(prefix) {
            prefixes.push(prefix.clone());
        }
    }

    let mut directives: Vec<Annotated> = steps
        .iter()
        .map(|step| Annotated {
            line: step.line,
            directive: Directive::Run(step.clone()),
        })
        .collect();
    let mut seen_check: FxHashMap<String, bool> = FxHashMap::default();

    for (index, text) in lines.iter().enumerate() {
        let line = u32::try_from(index + 1).unwrap_or(u32::MAX);

        if run::run_content(text).is_some() {
            continue;
        }

        if let Some((keyword, suffix, rest)) = find_keyword(text, &prefixes) {
            let rest = rest.trim();
            if prefixes.iter().any(|p| p == keyword) {
                let anchor = match suffix {
                    None => Anchor::Exact,
                    Some("-NEXT") => Anchor::Next,
                    Some(other) => {
                        return Err(FixtureError::UnknownCheckSuffix {
                            line,
                            directive: format!("{keyword}{other}"),
                        })
                    }
                };
                let first_seen = seen_check.entry(keyword.to_string()).or_insert(false);
                if anchor == Anchor::Next && !*first_seen {
                    return Err(FixtureError::NextWithoutPrevious {
                        line,
                        prefix: keyword.to_string(),
                    });
                }
                *first_seen = true;
                if rest.is_empty() {
                    return Err(FixtureError::EmptyCheck {
                        line,
                        prefix: keyword.to_string(),
                    });
                }
                let pattern =
                    Pattern::parse(rest).map_err(|source| FixtureError::Pattern { line, source })?;
                directives.push(Annotated {
                    line,
                    directive: Directive::Check {
                        prefix: keyword.to_string(),
                        expectation: ExpectationPattern::new(anchor, pattern, line),
                    },
                });
            } else if let Some(directive) = keyword_directive(keyword, rest, line)? {
                directives.push(Annotated { line, directive });
            }
        }

        for expected in expected::parse_line(text, line, line_count)? {
            directives.push(Annotated {
                line,
                directive: Directive::Expected(expected),
            });
        }
    }

    for step in &steps {
        if let Sink::CheckOutput { prefix } = &step.sink {
            if !seen_check.contains_key(prefix) {
                return Err(FixtureError::NoChecks {
                    line: step.line,
                    prefix: prefix.clone(),
                });
            }
        }
    }

    directives.sort_by_key(|annotated| annotated.line);
    tracing::trace!(count = directives.len(), "parsed fixture directives");
    Ok(directives)
}

const KEYWORDS: [&str; 4] = ["REQUIRES", "UNSUPPORTED", "XFAIL", "PREREQ"];

#[expect(clippy::expect_used, reason = "constant pattern")]
fn directive_head_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w-])(?P<kw>\w+)(?P<suffix>-[\w-]+)?:").expect("directive regex is valid")
    })
}

/// The first `KEYWORD[-SUFFIX]:` on the line naming a directive or a check
/// prefix. Returns the keyword, its suffix and the text after the colon.
fn find_keyword<'a>(
    text: &'a str,
    prefixes: &[String],
) -> Option<(&'a str, Option<&'a str>, &'a str)> {
    directive_head_regex().captures_iter(text).find_map(|caps| {
        let keyword = caps.name("kw")?.as_str();
        let suffix = caps.name("suffix").map(|m| m.as_str());
        let known = prefixes.iter().any(|p| p == keyword)
            || (suffix.is_none() && KEYWORDS.contains(&keyword));
        let end = caps.get(0)?.end();
        known.then(|| (keyword, suffix, &text[end..]))
    })
}

fn keyword_directive(
    keyword: &str,
    rest: &str,
    line: u32,
) -> Result<Option<Directive>, FixtureError> {
    let directive = match keyword {
        "REQUIRES" => Directive::Requires(feature_list(rest, line, "REQUIRES")?),
        "UNSUPPORTED" => Directive::Unsupported(feature_list(rest, line, "UNSUPPORTED")?),
        "XFAIL" => Directive::XFail(feature_list(rest, line, "XFAIL")?),
        "PREREQ" => {
            let valid = !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(FixtureError::InvalidPrereqName {
                    line,
                    name: rest.to_string(),
                });
            }
            Directive::Prereq(rest.to_string())
        }
        _ => return Ok(None),
    };
    Ok(Some(directive))
}

fn feature_list(
    rest: &str,
    line: u32,
    directive: &'static str,
) -> Result<Vec<Requirement>, FixtureError> {
    let features: Vec<Requirement> = rest
        .split(',')
        .map(str::trim)
        .filter(|feature| !feature.is_empty())
        .map(Requirement::parse)
        .collect();
    if features.is_empty() {
        return Err(FixtureError::EmptyDirective { line, directive });
    }
    Ok(features)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
