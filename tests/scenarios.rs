//! End-to-end runs through the command-line layer.
//!
//! Tests parse real argument lists, run them against in-memory writers and
//! check both output streams.

use clap::error::ErrorKind;
use clap::Parser;
use data_maker::cli::Cli;
use data_maker::runner::{run, Outcome, RunError};

struct Captured {
    out: String,
    diag: String,
    outcome: Outcome,
}

fn run_args(args: &[&str]) -> Result<Captured, RunError> {
    let cli = Cli::try_parse_from(std::iter::once("data-maker").chain(args.iter().copied())).unwrap();
    let config = cli.into_config().unwrap();
    let mut out = Vec::new();
    let mut diag = Vec::new();
    let outcome = run(&config, &mut out, &mut diag)?;
    Ok(Captured {
        out: String::from_utf8(out).unwrap(),
        diag: String::from_utf8(diag).unwrap(),
        outcome,
    })
}

// ─── Full Runs ─────────────────────────────────────────────────────────────────

#[test]
fn all_true_two_by_two() {
    let run = run_args(&["-r", "2", "-c", "2", "-f", "True", "--seed", "5"]).unwrap();
    assert_eq!(run.out, "0,0\n0,1\n1,0\n1,1\n");
    assert_eq!(run.diag, "Seed: 5\nBit count: 4\nDensity: 1.0\n");
}

#[test]
fn all_false_three_by_three() {
    let run = run_args(&["-r", "3", "-c", "3", "-f", "False", "--seed", "5"]).unwrap();
    assert_eq!(run.out, "");
    assert_eq!(run.diag, "Seed: 5\nBit count: 0\nDensity: 0.0\n");
}

#[test]
fn always_true_emits_every_cell_once() {
    let run = run_args(&["-r", "13", "-c", "7", "-f", "1", "--seed", "1"]).unwrap();
    let expected: String = (0..13)
        .flat_map(|r| (0..7).map(move |c| format!("{},{}\n", r, c)))
        .collect();
    assert_eq!(run.out, expected);
    assert_eq!(run.outcome.bit_count(), 91);
}

#[test]
fn diagonal_selects_n_cells() {
    let run = run_args(&["-r", "50", "-c", "50", "-f", "r == c", "--seed", "1"]).unwrap();
    assert_eq!(run.outcome.bit_count(), 50);
    assert!(run.out.lines().all(|line| {
        let (r, c) = line.split_once(',').unwrap();
        r == c
    }));
    assert!(run.diag.ends_with("Bit count: 50\nDensity: 0.02\n"));
}

#[test]
fn large_counts_are_grouped() {
    let run = run_args(&["-r", "1000", "-c", "20", "-f", "True", "--seed", "1"]).unwrap();
    assert!(run.diag.contains("Bit count: 20,000\n"));
}

#[test]
fn same_seed_is_byte_identical() {
    let args = [
        "-r",
        "200",
        "-c",
        "100",
        "-f",
        "0.3 < random.gauss(mu=0.5, sigma=0.4) < 0.6",
        "--seed",
        "1488",
    ];
    let first = run_args(&args).unwrap();
    let second = run_args(&args).unwrap();
    assert_eq!(first.out, second.out);
    assert_eq!(first.diag, second.diag);
    assert!(first.outcome.bit_count() > 0);
}

#[test]
fn different_seeds_differ() {
    let run = |seed: &str| run_args(&["-r", "100", "-c", "100", "-f", "random() < 0.5", "--seed", seed]).unwrap();
    assert_ne!(run("1").out, run("2").out);
}

// ─── Dry Runs ──────────────────────────────────────────────────────────────────

#[test]
fn dry_run_all_true() {
    let run = run_args(&["-r", "100", "-c", "100", "-f", "True", "--dry-run", "--seed", "3"]).unwrap();
    assert_eq!(run.out, "Estimated bit count: 10,000\nEstimated density: 1.0\n");
    assert_eq!(run.diag, "Seed: 3\n");
}

#[test]
fn dry_run_all_false() {
    let run = run_args(&["-r", "12345", "-c", "678", "-f", "False", "--dry-run"]).unwrap();
    assert_eq!(run.out, "Estimated bit count: 0\nEstimated density: 0.0\n");
    assert_eq!(run.outcome.bit_count(), 0);
}

#[test]
fn dry_run_all_true_scales_to_grid() {
    let run = run_args(&["-r", "3000", "-c", "7", "-f", "True", "--dry-run"]).unwrap();
    assert_eq!(run.outcome.bit_count(), 21_000);
    assert_eq!(run.outcome.density(), 1.0);
}

#[test]
fn dry_run_estimate_is_close() {
    let run = run_args(&["-r", "1000", "-c", "1000", "-f", "random_bit(0, 0.1)", "--dry-run", "--seed", "8"]).unwrap();
    let density = run.outcome.density();
    assert!((density - 0.1).abs() < 0.01, "density = {}", density);
}

// ─── Errors ────────────────────────────────────────────────────────────────────

#[test]
fn missing_required_arguments() {
    for args in [
        &["-c", "3", "-f", "True"][..],
        &["-r", "3", "-f", "True"][..],
        &["-r", "3", "-c", "3"][..],
    ] {
        let cli = Cli::try_parse_from(std::iter::once("data-maker").chain(args.iter().copied())).unwrap();
        let err = cli.into_config().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);
    }
}

#[test]
fn malformed_function_fails_before_output() {
    for function in ["r <", "foo(1)", "gauss(1, 2, 3)", "import os", "r = 1"] {
        let err = run_args(&["-r", "2", "-c", "2", "-f", function, "--seed", "1"]);
        assert!(matches!(err, Err(RunError::Compile(_))), "function = {}", function);
    }
}

#[test]
fn failing_function_aborts_run() {
    let err = run_args(&["-r", "2", "-c", "2", "-f", "1 / c > 0", "--seed", "1"]);
    assert!(matches!(err, Err(RunError::Eval(_))));
}

#[test]
fn long_operator_chain_is_rejected() {
    let function = format!("{}1 > 0", "1 + ".repeat(200_000));
    let err = run_args(&["-r", "1", "-c", "1", "-f", function.as_str(), "--seed", "1"]);
    assert!(matches!(err, Err(RunError::Compile(_))));
}

#[test]
fn seed_is_printed_before_compile_errors() {
    let cli = Cli::try_parse_from(["data-maker", "-r", "2", "-c", "2", "-f", "r <", "--seed", "9"]).unwrap();
    let config = cli.into_config().unwrap();
    let mut out = Vec::new();
    let mut diag = Vec::new();
    assert!(run(&config, &mut out, &mut diag).is_err());
    assert!(out.is_empty());
    assert_eq!(diag, b"Seed: 9\n");
}
