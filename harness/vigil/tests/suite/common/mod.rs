//! Shared suite scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vigil::{SuiteConfig, TestRunner, TestRunnerConfig, TestSummary};

pub const PLAYGROUND_FIXTURE: &str = include_str!(
    "../../../../vigil_fixture/tests/fixtures/implicit_return_func_binaryoperation_args.swift"
);

pub const APPLICATION_MAIN_FIXTURE: &str =
    include_str!("../../../../vigil_fixture/tests/fixtures/attr_UIApplicationMain_multiple.swift");

/// What the instrumented `add(3, 4)` program prints.
pub const PLAYGROUND_LOG: &str = "\
[17:1-17:10] __builtin_log_scope_entry
[15:3-15:6] __builtin_log[lhs='3']
[15:9-15:12] __builtin_log[rhs='4']
[15:3-15:12] __builtin_log[='7']
[17:1-17:10] __builtin_log_scope_exit
[17:1-17:10] __builtin_log[='7']
";

/// Fake compiler: whatever `-o` names becomes a script printing
/// `tools/playground.log`.
const FAKE_SWIFTC: &str = r#"here=$(dirname "$0")
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
if [ -z "$out" ]; then echo "fake-swiftc: missing -o" >&2; exit 1; fi
printf 'cat "%s"\n' "$here/playground.log" > "$out"
"#;

/// Fake frontend: reports the three `@UIApplicationMain` conflicts.
pub const FAKE_FRONTEND: &str = r#"for arg in "$@"; do file="$arg"; done
for line in 7 13 19; do
  echo "$file:$line:1: error: 'UIApplicationMain' attribute can only apply to one class in a module" >&2
  echo "$file:$line:1: warning: 'UIApplicationMain' is deprecated; this is an error in Swift 6" >&2
  echo "$file:$line:1: note: use @main instead" >&2
  echo "fix-it:\"$file\":{$line:1-$line:19}:\"@main\"" >&2
done
exit 1
"#;

pub const PLAYGROUND_CONFIG: &str = r#"
features = ["executable_test"]

[substitutions]
"%target-build-swift" = "sh %S/tools/fake-swiftc.sh"
"%target-codesign" = "true"
"%target-run" = "sh"
"#;

pub const FRONTEND_CONFIG: &str = r#"
features = ["objc_interop"]

[substitutions]
"%target-swift-frontend(mock-sdk: %clang-importer-sdk)" = "sh %S/tools/fake-frontend.sh"
"#;

/// A temporary suite directory.
pub struct FakeSuite {
    pub dir: TempDir,
}

impl FakeSuite {
    pub fn new(config: &str) -> Self {
        let suite = FakeSuite {
            dir: tempfile::tempdir().unwrap(),
        };
        suite.write("vigil.toml", config);
        suite.write("tools/fake-swiftc.sh", FAKE_SWIFTC);
        suite.write("tools/fake-frontend.sh", FAKE_FRONTEND);
        suite.write("tools/playground.log", PLAYGROUND_LOG);
        suite
    }

    /// Suite with the playground fixture and a log the fake binary prints.
    pub fn playground(log: &str) -> (Self, PathBuf) {
        let suite = FakeSuite::new(PLAYGROUND_CONFIG);
        suite.write("tools/playground.log", log);
        let fixture = suite.write("playground.swift", PLAYGROUND_FIXTURE);
        (suite, fixture)
    }

    pub fn application_main() -> (Self, PathBuf) {
        let suite = FakeSuite::new(FRONTEND_CONFIG);
        let fixture = suite.write("attr/multiple.swift", APPLICATION_MAIN_FIXTURE);
        (suite, fixture)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn runner(&self, config: TestRunnerConfig) -> TestRunner {
        let suite = SuiteConfig::discover(self.root()).unwrap().unwrap();
        TestRunner::with_config(config, suite).unwrap()
    }

    pub fn run(&self, path: &Path) -> TestSummary {
        self.runner(TestRunnerConfig::default()).run(path)
    }
}
