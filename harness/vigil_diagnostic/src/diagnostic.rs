//! Diagnostic record types.

use std::fmt;
use std::path::Path;

use vigil_check::Subject;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Remark,
}

impl Severity {
    /// Parse the severity word a compiler prints (`error`, `warning`, ...).
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "note" => Some(Severity::Note),
            "remark" => Some(Severity::Remark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Remark => "remark",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 1-based line/column position.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A suggested source edit attached to a diagnostic.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FixIt {
    pub range_start: Position,
    pub range_end: Position,
    pub replacement: String,
}

impl FixIt {
    pub fn new(range_start: Position, range_end: Position, replacement: impl Into<String>) -> Self {
        FixIt {
            range_start,
            range_end,
            replacement: replacement.into(),
        }
    }

    /// Whether the edit stays within `line`.
    pub fn is_on_line(&self, line: u32) -> bool {
        self.range_start.line == line && self.range_end.line == line
    }
}

impl fmt::Display for FixIt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{{{}-{}={}}}}}",
            self.range_start, self.range_end, self.replacement
        )
    }
}

/// One diagnostic emitted by the tool under test.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    /// File as printed by the tool (`<unknown>` for location-less diagnostics).
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
    pub message: String,
    pub fix_its: Vec<FixIt>,
}

impl DiagnosticRecord {
    pub fn new(
        severity: Severity,
        file: impl Into<String>,
        line: u32,
        column: Option<u32>,
        message: impl Into<String>,
    ) -> Self {
        DiagnosticRecord {
            severity,
            file: file.into(),
            line,
            column,
            message: message.into(),
            fix_its: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_fix_it(mut self, fix_it: FixIt) -> Self {
        self.fix_its.push(fix_it);
        self
    }

    /// Whether the tool reported this diagnostic against `fixture`.
    ///
    /// The tool runs in the fixture's directory, so a relative `file` may
    /// name the fixture by a trailing part of its path (`main.swift`,
    /// `./main.swift`) or relative to that directory.
    pub fn is_in_file(&self, fixture: &Path) -> bool {
        let file = Path::new(&self.file);
        if file == fixture {
            return true;
        }
        let file = file.strip_prefix(".").unwrap_or(file);
        if file.as_os_str().is_empty() {
            return false;
        }
        if file.is_relative() && fixture.ends_with(file) {
            return true;
        }
        let resolved = match fixture.parent() {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file.to_path_buf(),
        };
        match (resolved.canonicalize(), fixture.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Subject for DiagnosticRecord {
    fn text(&self) -> &str {
        &self.message
    }

    fn source_line(&self) -> Option<u32> {
        Some(self.line)
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "{}:{}:{}", self.file, self.line, column)?,
            None => write!(f, "{}:{}", self.file, self.line)?,
        }
        write!(f, ": {}: {}", self.severity, self.message)?;
        for fix_it in &self.fix_its {
            write!(f, " {fix_it}")?;
        }
        Ok(())
    }
}
