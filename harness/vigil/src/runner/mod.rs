//! Test execution engine.
//!
//! Discovers fixtures under a path and runs each one through its RUN
//! steps, collecting one [`TestResult`] per fixture.

mod fixture;

use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use vigil_check::MatchOptions;
use vigil_fixture::ParseOptions;

use crate::build_cache::BuildCache;
use crate::config::SuiteConfig;
use crate::discovery::{discover_tests_in, TestFile};
use crate::error::HarnessError;
use crate::process::CancelToken;
use crate::result::{TestResult, TestSummary};
use crate::xfail::XFailSet;

pub use fixture::run_fixture;

/// Configuration for the test runner.
///
/// `jobs` and `timeout` override the suite config when set.
#[derive(Clone, Debug)]
pub struct TestRunnerConfig {
    /// Only run fixtures whose path contains this substring.
    pub filter: Option<String>,
    pub verbose: bool,
    pub parallel: bool,
    pub jobs: Option<usize>,
    pub timeout: Option<Duration>,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        TestRunnerConfig {
            filter: None,
            verbose: false,
            parallel: true,
            jobs: None,
            timeout: None,
        }
    }
}

/// Everything one fixture run reads. Shared by all workers.
#[derive(Debug)]
pub struct RunContext<'a> {
    pub suite: &'a SuiteConfig,
    pub parse_options: ParseOptions,
    pub match_options: MatchOptions,
    pub features: FxHashSet<String>,
    pub timeout: Duration,
    pub cache: &'a BuildCache,
    pub xfail: &'a XFailSet,
    pub cancel: &'a CancelToken,
}

impl<'a> RunContext<'a> {
    pub fn new(
        suite: &'a SuiteConfig,
        timeout: Duration,
        cache: &'a BuildCache,
        xfail: &'a XFailSet,
        cancel: &'a CancelToken,
    ) -> Self {
        RunContext {
            suite,
            parse_options: ParseOptions {
                verify_flag: suite.verify_flag.clone(),
                check_prefixes: Vec::new(),
            },
            match_options: MatchOptions {
                strict_whitespace: suite.strict_whitespace,
                allow_trailing_output: suite.allow_trailing_output,
            },
            features: suite.available_features(),
            timeout,
            cache,
            xfail,
            cancel,
        }
    }
}

/// Test runner.
///
/// One runner owns one build cache, so prerequisites are built at most once
/// per runner no matter how many fixtures or runs ask for them.
pub struct TestRunner {
    config: TestRunnerConfig,
    suite: SuiteConfig,
    cache: BuildCache,
    cancel: CancelToken,
}

impl TestRunner {
    pub fn new(suite: SuiteConfig) -> Result<Self, HarnessError> {
        Self::with_config(TestRunnerConfig::default(), suite)
    }

    pub fn with_config(config: TestRunnerConfig, suite: SuiteConfig) -> Result<Self, HarnessError> {
        Ok(TestRunner {
            config,
            suite,
            cache: BuildCache::new().map_err(HarnessError::Workspace)?,
            cancel: CancelToken::new(),
        })
    }

    /// Share `cancel` with the runner, e.g. one set from a Ctrl-C handler.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts the run when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &TestRunnerConfig {
        &self.config
    }

    pub fn build_cache(&self) -> &BuildCache {
        &self.cache
    }

    /// Run every fixture in a path (file or directory).
    pub fn run(&self, path: &Path) -> TestSummary {
        let mut files = discover_tests_in(path, &self.suite);
        if let Some(filter) = &self.config.filter {
            files.retain(|file| file.path.to_string_lossy().contains(filter.as_str()));
        }
        tracing::debug!(count = files.len(), path = %path.display(), "discovered fixtures");

        let xfail_dir = if path.is_file() {
            path.parent().unwrap_or(path)
        } else {
            path
        };
        let xfail = XFailSet::load(xfail_dir);
        let timeout = self.config.timeout.unwrap_or_else(|| self.suite.timeout());
        let ctx = RunContext::new(&self.suite, timeout, &self.cache, &xfail, &self.cancel);

        if self.config.parallel {
            self.run_parallel(&files, &ctx)
        } else {
            Self::run_sequential(&files, &ctx)
        }
    }

    fn run_sequential(files: &[TestFile], ctx: &RunContext<'_>) -> TestSummary {
        let start = Instant::now();
        let mut summary = TestSummary::new();
        for file in files {
            summary.add_result(run_fixture(&file.path, ctx));
        }
        summary.duration = start.elapsed();
        summary
    }

    /// Run fixtures in parallel on a scoped rayon pool.
    ///
    /// `build_scoped` guarantees the pool is torn down before returning,
    /// avoiding the global pool's atexit hang. Results keep discovery order.
    fn run_parallel(&self, files: &[TestFile], ctx: &RunContext<'_>) -> TestSummary {
        let start = Instant::now();
        let jobs = self.config.jobs.or(self.suite.jobs).unwrap_or(0);

        let results: Vec<TestResult> = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| {
                    files
                        .par_iter()
                        .map(|file| run_fixture(&file.path, ctx))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create thread pool ({e}), running sequentially");
                files.iter().map(|file| run_fixture(&file.path, ctx)).collect()
            });

        let mut summary = TestSummary::new();
        for result in results {
            summary.add_result(result);
        }
        summary.duration = start.elapsed();
        summary
    }
}

/// Run every fixture under `path` with the suite config found for it.
pub fn run_tests(
    path: &Path,
    config: TestRunnerConfig,
    suite: SuiteConfig,
) -> Result<TestSummary, HarnessError> {
    Ok(TestRunner::with_config(config, suite)?.run(path))
}
