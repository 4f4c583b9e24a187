//! Expected failure (XFAIL) lists.
//!
//! Besides the in-fixture `XFAIL:` directive, a suite may keep an
//! `xfail.txt` listing fixtures known to fail. Matching failures become
//! expected failures; unexpected passes produce warnings so stale entries
//! get removed.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

pub const XFAIL_FILE_NAME: &str = "xfail.txt";

/// Fixtures expected to fail.
#[derive(Debug, Default)]
pub struct XFailSet {
    /// Fixture file names (`test:playground.swift`), matched anywhere.
    names: FxHashSet<String>,
    /// Fixture paths, resolved against the list's directory.
    files: FxHashSet<PathBuf>,
}

impl XFailSet {
    pub fn empty() -> Self {
        XFailSet::default()
    }

    /// Load `xfail.txt` from `test_dir` or its nearest ancestor that has
    /// one. A missing file yields an empty set.
    ///
    /// Format:
    /// - Lines starting with `#` are comments
    /// - Blank lines are ignored
    /// - `test:name` marks every fixture with that file name
    /// - `file:path` marks one fixture, relative to the list's directory
    pub fn load(test_dir: &Path) -> Self {
        let mut dir = Some(test_dir);
        while let Some(d) = dir {
            let path = d.join(XFAIL_FILE_NAME);
            if let Ok(content) = std::fs::read_to_string(&path) {
                tracing::debug!(path = %path.display(), "loaded xfail list");
                return Self::parse(&content, d);
            }
            dir = d.parent();
        }
        Self::empty()
    }

    fn parse(content: &str, base: &Path) -> Self {
        let mut set = XFailSet::empty();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(name) = trimmed.strip_prefix("test:") {
                let name = name.trim();
                if !name.is_empty() {
                    set.names.insert(name.to_string());
                }
            } else if let Some(path) = trimmed.strip_prefix("file:") {
                let path = path.trim();
                if !path.is_empty() {
                    set.files.insert(base.join(path));
                }
            }
            // Unknown prefixes are ignored.
        }

        set
    }

    /// Whether the fixture at `path` is listed.
    pub fn contains(&self, path: &Path) -> bool {
        let named = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.names.contains(n));
        if named || self.files.contains(path) {
            return true;
        }
        let Ok(canonical) = path.canonicalize() else {
            return false;
        };
        self.files.iter().any(|expected| {
            expected
                .canonicalize()
                .is_ok_and(|expected| expected == canonical)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.files.is_empty()
    }
}
