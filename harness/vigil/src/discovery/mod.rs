//! Fixture discovery.
//!
//! Finds every file whose name ends in one of the suite's fixture suffixes.
//! `Inputs/` directories hold auxiliary sources and are never searched.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SuiteConfig;

/// A discovered fixture file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestFile {
    pub path: PathBuf,
}

impl TestFile {
    pub fn new(path: PathBuf) -> Self {
        TestFile { path }
    }
}

/// Discover all fixtures under `root`, sorted by path.
pub fn discover_tests(root: &Path, config: &SuiteConfig) -> Vec<TestFile> {
    let mut files = Vec::new();
    discover_recursive(root, config, &mut files);
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

fn discover_recursive(dir: &Path, config: &SuiteConfig, files: &mut Vec<TestFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if matches!(name, "Inputs" | "target" | "node_modules") {
                continue;
            }
            discover_recursive(&path, config, files);
        } else if config.is_fixture_name(&path) {
            files.push(TestFile::new(path));
        }
    }
}

/// Discover fixtures in a specific file or directory.
///
/// A file is returned as-is if its suffix marks it as a fixture.
pub fn discover_tests_in(path: &Path, config: &SuiteConfig) -> Vec<TestFile> {
    if path.is_file() {
        if config.is_fixture_name(path) {
            vec![TestFile::new(path.to_path_buf())]
        } else {
            vec![]
        }
    } else if path.is_dir() {
        discover_tests(path, config)
    } else {
        vec![]
    }
}
