//! Suite configuration (`vigil.toml`).
//!
//! The file is found by walking up from the test path, so
//! `vigil test suite/attr/foo.swift` still picks up `suite/vigil.toml`.
//! Command-line flags override what the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use vigil_fixture::DEFAULT_VERIFY_FLAG;

pub const CONFIG_FILE_NAME: &str = "vigil.toml";

/// Errors loading a suite configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A shared module built once per suite.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Prerequisite {
    /// Shell command; `%o` is the output directory, `%S` the suite root.
    pub command: String,
}

/// Contents of `vigil.toml`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// File suffixes that mark fixtures (`.swift`, `.test`).
    pub suffixes: Vec<String>,
    /// Features available to `REQUIRES`/`UNSUPPORTED`/`XFAIL`.
    pub features: Vec<String>,
    pub timeout_secs: u64,
    /// Worker threads; `None` uses rayon's default.
    pub jobs: Option<usize>,
    pub verify_flag: String,
    pub allow_trailing_output: bool,
    pub strict_whitespace: bool,
    pub substitutions: FxHashMap<String, String>,
    pub prerequisites: FxHashMap<String, Prerequisite>,
    /// Directory holding the config file. Empty for the built-in default.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        SuiteConfig {
            suffixes: [".swift", ".c", ".ll", ".test"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            features: Vec::new(),
            timeout_secs: 60,
            jobs: None,
            verify_flag: DEFAULT_VERIFY_FLAG.to_string(),
            allow_trailing_output: false,
            strict_whitespace: false,
            substitutions: FxHashMap::default(),
            prerequisites: FxHashMap::default(),
            root: PathBuf::new(),
        }
    }
}

impl SuiteConfig {
    /// Parse and validate config text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SuiteConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; its directory becomes the suite root.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        tracing::debug!(path = %path.display(), "loaded suite config");
        Ok(config)
    }

    /// Find `vigil.toml` in `start` or its ancestors.
    ///
    /// Returns `Ok(None)` if there is none.
    pub fn discover(start: &Path) -> Result<Option<Self>, ConfigError> {
        let mut dir = if start.is_file() {
            start.parent()
        } else {
            Some(start)
        };
        while let Some(d) = dir {
            let candidate = d.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
            dir = d.parent();
        }
        Ok(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.suffixes.is_empty() {
            return Err(ConfigError::Invalid("`suffixes` must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("`timeout_secs` must be positive".into()));
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::Invalid("`jobs` must be positive".into()));
        }
        if self.verify_flag.trim().is_empty() {
            return Err(ConfigError::Invalid("`verify_flag` must not be empty".into()));
        }
        if let Some(key) = self.substitutions.keys().find(|k| !k.starts_with('%') || k.len() < 2) {
            return Err(ConfigError::Invalid(format!(
                "substitution `{key}` must start with `%`"
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured features plus the host OS (`linux`, `macos`, `windows`).
    pub fn available_features(&self) -> FxHashSet<String> {
        let mut features: FxHashSet<String> = self.features.iter().cloned().collect();
        features.insert(host_feature().to_string());
        features
    }

    /// Whether `path` names a fixture by suffix.
    pub fn is_fixture_name(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.suffixes.iter().any(|s| name.ends_with(s.as_str())))
    }
}

/// The built-in feature naming the host OS.
pub fn host_feature() -> &'static str {
    std::env::consts::OS
}
