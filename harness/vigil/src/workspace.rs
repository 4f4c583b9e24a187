//! Per-fixture scratch directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory owned by one fixture run.
///
/// Removed when dropped, on every exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("vigil-").tempdir()?;
        Ok(Workspace { dir })
    }

    /// `%T`: the workspace directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// `%t`: the fixture's output path inside the workspace.
    pub fn output(&self) -> PathBuf {
        self.dir.path().join("Output")
    }
}
