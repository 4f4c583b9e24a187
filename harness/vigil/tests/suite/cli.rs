//! The `vigil` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use crate::common::{FakeSuite, PLAYGROUND_LOG};

fn vigil(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_vigil"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    if let Some(input) = stdin {
        child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    }
    drop(child.stdin.take());
    child.wait_with_output().unwrap()
}

fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_command_exit_codes() {
    let (suite, _) = FakeSuite::playground(PLAYGROUND_LOG);
    let ok = vigil(&["test", &path_arg(suite.root())], None);
    assert_eq!(ok.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&ok.stdout);
    assert!(stdout.contains("1 passed, 0 failed, 0 skipped (1 total)"), "{stdout}");
    assert!(stdout.trim_end().ends_with("OK"));

    suite.write("tools/playground.log", &PLAYGROUND_LOG.replace("rhs='4'", "rhs='5'"));
    let failed = vigil(&["test", &path_arg(suite.root()), "--no-parallel"], None);
    assert_eq!(failed.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&failed.stdout);
    assert!(stdout.contains("FAIL: "), "{stdout}");
    assert!(stdout.contains("(stage: matching)"), "{stdout}");
    assert!(stdout.contains("--- expected"), "{stdout}");

    let empty = tempfile::tempdir().unwrap();
    let none = vigil(&["test", &path_arg(empty.path())], None);
    assert_eq!(none.status.code(), Some(2));
}

#[test]
fn filecheck_reads_stdin() {
    let (_suite, fixture) = FakeSuite::playground(PLAYGROUND_LOG);
    let ok = vigil(&["filecheck", &path_arg(&fixture)], Some(PLAYGROUND_LOG));
    assert_eq!(ok.status.code(), Some(0));

    let bad = vigil(
        &["filecheck", &path_arg(&fixture)],
        Some(&PLAYGROUND_LOG.replace("scope_exit", "scope_leave")),
    );
    assert_eq!(bad.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad.stderr).contains("+++ actual"));
}

#[test]
fn verify_reads_input_file() {
    let (suite, fixture) = FakeSuite::application_main();
    let mut output = String::new();
    for line in [7, 13, 19] {
        output.push_str(&format!(
            "multiple.swift:{line}:1: error: 'UIApplicationMain' attribute can only apply to one class in a module\n\
             multiple.swift:{line}:1: warning: 'UIApplicationMain' is deprecated; this is an error in Swift 6\n\
             multiple.swift:{line}:1: note: use @main instead\n\
             fix-it:\"multiple.swift\":{{{line}:1-{line}:19}}:\"@main\"\n"
        ));
    }
    let input = suite.write("captured.txt", &output);
    let ok = vigil(
        &["verify", &path_arg(&fixture), &format!("--input={}", path_arg(&input))],
        None,
    );
    assert_eq!(ok.status.code(), Some(0), "{}", String::from_utf8_lossy(&ok.stderr));

    let partial = suite.write("partial.txt", output.lines().next().unwrap());
    let missing = vigil(
        &["verify", &path_arg(&fixture), &format!("--input={}", path_arg(&partial))],
        None,
    );
    assert_eq!(missing.status.code(), Some(1));
}

#[test]
fn parse_dumps_directives() {
    let (_suite, fixture) = FakeSuite::playground(PLAYGROUND_LOG);
    let out = vigil(&["parse", &path_arg(&fixture)], None);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("REQUIRES executable_test"), "{stdout}");
    assert!(stdout.contains("RUN [run, check CHECK] %target-run %t/main"), "{stdout}");
    assert!(stdout.contains("CHECK-NEXT"), "{stdout}");
}

#[test]
fn unknown_command_is_usage_error() {
    let out = vigil(&["frobnicate"], None);
    assert_eq!(out.status.code(), Some(2));
}
