//! Parsed fixtures.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use vigil_check::ExpectationPattern;
use vigil_diagnostic::ExpectedDiagnostic;

use crate::{parse, Annotated, Directive, FixtureError, ParseOptions, Requirement, RunStep};

/// A fixture file and its directives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fixture {
    pub path: PathBuf,
    pub directives: Vec<Annotated>,
}

impl Fixture {
    /// Parse fixture text. `path` is recorded for `%s` and reports.
    pub fn parse(
        path: impl Into<PathBuf>,
        source: &str,
        options: &ParseOptions,
    ) -> Result<Self, FixtureError> {
        Ok(Fixture {
            path: path.into(),
            directives: parse(source, options)?,
        })
    }

    /// Read and parse a fixture file.
    pub fn load(path: &Path, options: &ParseOptions) -> Result<Self, FixtureError> {
        let source = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &source, options)
    }

    pub fn run_steps(&self) -> impl Iterator<Item = &RunStep> {
        self.directives.iter().filter_map(|a| match &a.directive {
            Directive::Run(step) => Some(step),
            _ => None,
        })
    }

    /// Check expectations for `prefix`, in declaration order.
    pub fn checks(&self, prefix: &str) -> Vec<ExpectationPattern> {
        self.directives
            .iter()
            .filter_map(|a| match &a.directive {
                Directive::Check {
                    prefix: p,
                    expectation,
                } if p == prefix => Some(expectation.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn expected_diagnostics(&self) -> Vec<ExpectedDiagnostic> {
        self.directives
            .iter()
            .filter_map(|a| match &a.directive {
                Directive::Expected(expected) => Some(expected.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of `PREREQ` modules, deduplicated, in declaration order.
    pub fn prerequisites(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for annotated in &self.directives {
            if let Directive::Prereq(name) = &annotated.directive {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn requirements<'a>(
        &'a self,
        select: impl Fn(&'a Directive) -> Option<&'a Vec<Requirement>> + 'a,
    ) -> impl Iterator<Item = &'a Requirement> + 'a {
        self.directives
            .iter()
            .filter_map(move |a| select(&a.directive))
            .flatten()
    }

    /// `REQUIRES` entries that `features` does not satisfy.
    pub fn missing_requirements(&self, features: &FxHashSet<String>) -> Vec<&Requirement> {
        self.requirements(|d| match d {
            Directive::Requires(list) => Some(list),
            _ => None,
        })
        .filter(|r| !r.holds(features))
        .collect()
    }

    /// The first `UNSUPPORTED` entry that holds for `features`.
    pub fn unsupported_by(&self, features: &FxHashSet<String>) -> Option<&Requirement> {
        self.requirements(|d| match d {
            Directive::Unsupported(list) => Some(list),
            _ => None,
        })
        .find(|r| r.holds(features))
    }

    /// Whether an `XFAIL` entry holds for `features`.
    pub fn expects_failure(&self, features: &FxHashSet<String>) -> bool {
        self.requirements(|d| match d {
            Directive::XFail(list) => Some(list),
            _ => None,
        })
        .any(|r| r.holds(features))
    }

    /// Why the fixture should be skipped for `features`, if it should.
    pub fn skip_reason(&self, features: &FxHashSet<String>) -> Option<String> {
        let missing = self.missing_requirements(features);
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            return Some(format!("missing feature: {}", names.join(", ")));
        }
        self.unsupported_by(features)
            .map(|r| format!("unsupported with {r}"))
    }
}
