//! Directive types.

use std::fmt;

use rustc_hash::FxHashSet;
use vigil_check::ExpectationPattern;
use vigil_diagnostic::ExpectedDiagnostic;

/// What the harness does with a step's output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sink {
    /// Output is only shown in failure reports.
    None,
    /// Stdout is collected as log events and matched against the check
    /// lines carrying `prefix`.
    CheckOutput { prefix: String },
    /// Stderr and stdout are collected as diagnostics and verified against
    /// the fixture's `expected-*` annotations.
    VerifyDiagnostics,
}

/// Which phase of a test a step belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Build,
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Build => write!(f, "build"),
            Stage::Run => write!(f, "run"),
        }
    }
}

/// One `RUN:` command, after continuation lines are joined.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunStep {
    /// Line of the first `RUN:` of this step.
    pub line: u32,
    /// Command template with `not`, the verify flag and the check pipe
    /// removed. Substitutions are not yet applied.
    pub command: String,
    /// The step as written, for reports.
    pub source: String,
    pub sink: Sink,
    pub stage: Stage,
    /// Written with a leading `not`: the command must exit non-zero.
    pub expect_failure: bool,
}

/// A feature named in `REQUIRES`, `UNSUPPORTED` or `XFAIL`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Requirement {
    pub feature: String,
    /// Written as `!feature`.
    pub negated: bool,
}

impl Requirement {
    /// Parse `feature` or `!feature`.
    pub fn parse(text: &str) -> Self {
        match text.strip_prefix('!') {
            Some(feature) => Requirement {
                feature: feature.trim().to_string(),
                negated: true,
            },
            None => Requirement {
                feature: text.to_string(),
                negated: false,
            },
        }
    }

    /// Whether the requirement holds for `features`. `*` always holds.
    pub fn holds(&self, features: &FxHashSet<String>) -> bool {
        let present = self.feature == "*" || features.contains(&self.feature);
        present != self.negated
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        f.write_str(&self.feature)
    }
}

/// A parsed annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Run(RunStep),
    /// All must hold.
    Requires(Vec<Requirement>),
    /// The test is skipped if any holds.
    Unsupported(Vec<Requirement>),
    /// The test is expected to fail if any holds.
    XFail(Vec<Requirement>),
    /// Shared prerequisite module, built once per suite.
    Prereq(String),
    Check {
        prefix: String,
        expectation: ExpectationPattern,
    },
    Expected(ExpectedDiagnostic),
}

/// A directive and the fixture line it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotated {
    pub line: u32,
    pub directive: Directive,
}
