//! Shared prerequisite builds.
//!
//! Each prerequisite is built at most once per suite. The first fixture to
//! ask builds it; fixtures asking concurrently block on the same cell and
//! reuse the published result, failure included.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tempfile::TempDir;

use crate::error::{ProcessFailure, StepFailure};

pub type BuildOutcome = Result<PathBuf, StepFailure>;

/// Keyed build lock over prerequisite output directories.
#[derive(Debug)]
pub struct BuildCache {
    root: TempDir,
    cells: Mutex<FxHashMap<String, Arc<OnceLock<BuildOutcome>>>>,
    builds: AtomicUsize,
}

impl BuildCache {
    pub fn new() -> std::io::Result<Self> {
        Ok(BuildCache {
            root: tempfile::Builder::new().prefix("vigil-prereq-").tempdir()?,
            cells: Mutex::new(FxHashMap::default()),
            builds: AtomicUsize::new(0),
        })
    }

    /// Return the output directory for `name`, running `build` into it if
    /// no one has yet.
    pub fn get_or_build<F>(&self, name: &str, build: F) -> BuildOutcome
    where
        F: FnOnce(&Path) -> Result<(), StepFailure>,
    {
        // Hold the map lock only long enough to find the cell.
        let cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(name.to_string()).or_default())
        };

        cell.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(prerequisite = name, "building prerequisite");
            let dir = self.root.path().join(name);
            std::fs::create_dir_all(&dir).map_err(|e| StepFailure {
                origin: format!("prerequisite {name}"),
                command: String::new(),
                failure: ProcessFailure::Spawn(e.to_string()),
                stdout: String::new(),
                stderr: String::new(),
            })?;
            build(&dir)?;
            Ok(dir)
        })
        .clone()
    }

    /// How many builds have started.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}
