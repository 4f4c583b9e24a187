//! Vigil CLI
//!
//! Compiler diagnostic and instrumentation test harness.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use commands::{filecheck, parse_fixture, run_tests, verify_output, TestOptions};
use vigil::CancelToken;

fn main() {
    vigil::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("Ctrl+C pressed, cancelling remaining tests...");
        handler_token.cancel();
    }) {
        tracing::warn!("failed to install Ctrl-C handler: {e}");
    }

    let command = &args[1];
    let code = match command.as_str() {
        "test" => {
            // Path is optional; flags can come before or after it.
            let mut path: Option<String> = None;
            let mut options = TestOptions::default();

            for arg in args.iter().skip(2) {
                if let Some(filter) = arg.strip_prefix("--filter=") {
                    options.runner.filter = Some(filter.to_string());
                } else if arg == "--verbose" || arg == "-v" {
                    options.runner.verbose = true;
                } else if arg == "--no-parallel" {
                    options.runner.parallel = false;
                } else if let Some(jobs) = arg.strip_prefix("--jobs=") {
                    match jobs.parse::<usize>() {
                        Ok(jobs) if jobs > 0 => options.runner.jobs = Some(jobs),
                        _ => {
                            eprintln!("error: --jobs expects a positive number, got `{jobs}`");
                            std::process::exit(2);
                        }
                    }
                } else if let Some(secs) = arg.strip_prefix("--timeout=") {
                    match secs.parse::<u64>() {
                        Ok(secs) if secs > 0 => {
                            options.runner.timeout = Some(Duration::from_secs(secs));
                        }
                        _ => {
                            eprintln!("error: --timeout expects seconds, got `{secs}`");
                            std::process::exit(2);
                        }
                    }
                } else if let Some(file) = arg.strip_prefix("--config=") {
                    options.config = Some(PathBuf::from(file));
                } else if !arg.starts_with('-') && path.is_none() {
                    path = Some(arg.clone());
                } else {
                    eprintln!("warning: ignoring unknown option `{arg}`");
                }
            }

            let path = path.unwrap_or_else(|| ".".to_string());
            run_tests(&path, options, &cancel)
        }
        "filecheck" => {
            let mut check_file: Option<&str> = None;
            let mut prefix: Option<&str> = None;
            let mut input: Option<&str> = None;
            for arg in args.iter().skip(2) {
                if let Some(p) = arg
                    .strip_prefix("--check-prefix=")
                    .or_else(|| arg.strip_prefix("-check-prefix="))
                {
                    prefix = Some(p);
                } else if let Some(file) = arg.strip_prefix("--input=") {
                    input = Some(file);
                } else if check_file.is_none() {
                    check_file = Some(arg.as_str());
                }
            }
            let Some(check_file) = check_file else {
                eprintln!("Usage: vigil filecheck <check-file> [--check-prefix=P] [--input=FILE]");
                std::process::exit(2);
            };
            filecheck(check_file, prefix, input)
        }
        "verify" => {
            let mut fixture: Option<&str> = None;
            let mut input: Option<&str> = None;
            for arg in args.iter().skip(2) {
                if let Some(file) = arg.strip_prefix("--input=") {
                    input = Some(file);
                } else if fixture.is_none() {
                    fixture = Some(arg.as_str());
                }
            }
            let Some(fixture) = fixture else {
                eprintln!("Usage: vigil verify <fixture> [--input=FILE]");
                std::process::exit(2);
            };
            verify_output(fixture, input)
        }
        "parse" => {
            if args.len() < 3 {
                eprintln!("Usage: vigil parse <fixture>");
                std::process::exit(2);
            }
            parse_fixture(&args[2])
        }
        "help" | "--help" | "-h" => {
            print_usage();
            0
        }
        "version" | "--version" | "-V" => {
            println!("vigil {}", env!("CARGO_PKG_VERSION"));
            0
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            2
        }
    };

    std::process::exit(code);
}

fn print_usage() {
    println!("Vigil (compiler diagnostic and instrumentation test harness)");
    println!();
    println!("Usage: vigil <command> [options]");
    println!();
    println!("Commands:");
    println!("  test [path]                Run fixtures (default: current directory)");
    println!("  filecheck <check-file>     Match CHECK lines against stdin or --input");
    println!("  verify <fixture>           Verify captured diagnostics against annotations");
    println!("  parse <fixture>            Parse and display a fixture's directives");
    println!("  help                       Show this help message");
    println!("  version                    Show version information");
    println!();
    println!("Test options:");
    println!("  --filter=<pattern>  Only run fixtures whose path contains pattern");
    println!("  --verbose, -v       Show passing, skipped and XFAIL fixtures");
    println!("  --no-parallel       Run fixtures sequentially");
    println!("  --jobs=<n>          Worker threads (overrides vigil.toml)");
    println!("  --timeout=<secs>    Per-step timeout (overrides vigil.toml)");
    println!("  --config=<file>     Use this vigil.toml instead of searching");
    println!();
    println!("Filecheck options:");
    println!("  --check-prefix=<P>  Match P: lines instead of CHECK:");
    println!("  --input=<file>      Read input from file instead of stdin");
    println!();
    println!("Verify options:");
    println!("  --input=<file>      Read compiler output from file instead of stdin");
    println!();
    println!("Environment:");
    println!("  VIGIL_LOG           Tracing filter (falls back to RUST_LOG)");
    println!("  VIGIL_LOG_TREE      Print tracing spans as a tree");
    println!();
    println!("Examples:");
    println!("  vigil test                              # Run every fixture under .");
    println!("  vigil test test/attr/ --filter=UIApp");
    println!("  swiftc -typecheck a.swift 2>&1 | vigil verify a.swift");
    println!("  ./main | vigil filecheck main.swift");
}
