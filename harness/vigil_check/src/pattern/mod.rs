//! Check-pattern syntax.
//!
//! A pattern is literal text with three kinds of embedded blocks:
//!
//! - `{{regex}}` matches the regex (`{{.*}}` is the usual placeholder),
//! - `[[NAME:regex]]` matches the regex and binds the text to `NAME`,
//! - `[[NAME]]` matches whatever an earlier line bound to `NAME`.
//!
//! A pattern matches a substring of a single line and never spans lines.

use std::borrow::Cow;
use std::fmt;

use regex::Regex;
use rustc_hash::FxHashMap;

/// One piece of a parsed pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Regex(String),
    Define { name: String, regex: String },
    Use(String),
}

/// Syntax errors found while parsing a pattern.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unterminated `{{{{` block starting at column {column}")]
    UnterminatedRegex { column: usize },
    #[error("empty regex block at column {column}")]
    EmptyRegex { column: usize },
    #[error("invalid regex `{regex}`: {message}")]
    InvalidRegex { regex: String, message: String },
    #[error("unterminated `[[` block starting at column {column}")]
    UnterminatedVariable { column: usize },
    #[error("invalid variable name `{name}`")]
    InvalidVariableName { name: String },
    #[error("variable `{name}` is defined twice in one pattern")]
    DuplicateVariable { name: String },
    #[error("variable `{name}` is used on the same line that defines it")]
    SameLineUse { name: String },
}

/// Errors turning a pattern into a concrete regex at match time.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InstantiateError {
    #[error("use of undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("pattern does not compile: {0}")]
    Regex(String),
}

/// A parsed check pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse pattern text as written after `CHECK:`.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut defined: Vec<&str> = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            let column = text.len() - rest.len() + 1;

            if let Some(after) = rest.strip_prefix("{{") {
                let end = after
                    .find("}}")
                    .ok_or(PatternError::UnterminatedRegex { column })?;
                let regex = &after[..end];
                if regex.is_empty() {
                    return Err(PatternError::EmptyRegex { column });
                }
                validate_regex(regex)?;
                flush_literal(&mut literal, &mut segments);
                segments.push(Segment::Regex(regex.to_string()));
                rest = &after[end + 2..];
            } else if let Some(after) = rest.strip_prefix("[[") {
                let end = after
                    .find("]]")
                    .ok_or(PatternError::UnterminatedVariable { column })?;
                let body = &after[..end];
                flush_literal(&mut literal, &mut segments);
                if let Some((name, regex)) = body.split_once(':') {
                    validate_name(name)?;
                    validate_regex(regex)?;
                    if defined.contains(&name) {
                        return Err(PatternError::DuplicateVariable {
                            name: name.to_string(),
                        });
                    }
                    defined.push(name);
                    segments.push(Segment::Define {
                        name: name.to_string(),
                        regex: regex.to_string(),
                    });
                } else {
                    validate_name(body)?;
                    if defined.contains(&body) {
                        return Err(PatternError::SameLineUse {
                            name: body.to_string(),
                        });
                    }
                    segments.push(Segment::Use(body.to_string()));
                }
                rest = &after[end + 2..];
            } else {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    literal.push(c);
                }
                rest = chars.as_str();
            }
        }

        flush_literal(&mut literal, &mut segments);
        Ok(Pattern {
            source: text.to_string(),
            segments,
        })
    }

    /// A pattern that matches `text` verbatim, with no block syntax.
    pub fn literal(text: impl Into<String>) -> Self {
        let source = text.into();
        let segments = if source.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal(source.clone())]
        };
        Pattern { source, segments }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names bound by `[[NAME:regex]]` blocks, in order.
    pub fn defined_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::Define { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Build the regex for this pattern given the current variable bindings.
    ///
    /// Unless `strict_whitespace` is set, literal runs of spaces and tabs are
    /// collapsed to one space; callers canonicalize the subject the same way.
    pub fn instantiate(
        &self,
        vars: &FxHashMap<String, String>,
        strict_whitespace: bool,
    ) -> Result<Regex, InstantiateError> {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(text) => {
                    let text = if strict_whitespace {
                        Cow::Borrowed(text.as_str())
                    } else {
                        canonicalize_whitespace(text)
                    };
                    out.push_str(&regex::escape(&text));
                }
                Segment::Regex(re) => {
                    out.push_str("(?:");
                    out.push_str(re);
                    out.push(')');
                }
                Segment::Define { name, regex } => {
                    out.push_str("(?P<");
                    out.push_str(name);
                    out.push('>');
                    out.push_str(regex);
                    out.push(')');
                }
                Segment::Use(name) => {
                    let value = vars
                        .get(name)
                        .ok_or_else(|| InstantiateError::UndefinedVariable(name.clone()))?;
                    out.push_str(&regex::escape(value));
                }
            }
        }
        Regex::new(&out).map_err(|e| InstantiateError::Regex(e.to_string()))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Collapse runs of spaces and tabs into a single space.
pub fn canonicalize_whitespace(text: &str) -> Cow<'_, str> {
    let needs_work = text
        .as_bytes()
        .windows(2)
        .any(|w| matches!(w[0], b' ' | b'\t') && matches!(w[1], b' ' | b'\t'))
        || text.contains('\t');
    if !needs_work {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    Cow::Owned(out)
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn validate_regex(regex: &str) -> Result<(), PatternError> {
    Regex::new(regex)
        .map(|_| ())
        .map_err(|e| PatternError::InvalidRegex {
            regex: regex.to_string(),
            message: e.to_string(),
        })
}

fn validate_name(name: &str) -> Result<(), PatternError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PatternError::InvalidVariableName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
