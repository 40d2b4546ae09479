use std::fs;
use std::io::{stdin, Read};
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use nonogram_solver::{Config, Solver, Verdict};
use tracing_subscriber::EnvFilter;

/// Solve paint-by-number puzzles
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Puzzle descriptor file; stdin when omitted
    puzzle: Option<PathBuf>,
    /// Collect and print statistics
    #[arg(long)]
    stats: bool,
    /// Guess heuristically instead of probing
    #[arg(long)]
    no_probe: bool,
    /// 1 probes the whole grid, above 1 recent neighbourhoods first
    #[arg(long, default_value_t = 2)]
    probe_level: u8,
    /// Disable merging of common probe consequences
    #[arg(long)]
    no_merge: bool,
    /// Never guess; report stuck instead
    #[arg(long)]
    no_backtrack: bool,
    /// Skip the exhaustive check before the first guess
    #[arg(long)]
    no_exhaust: bool,
    /// Look for a second solution and report uniqueness
    #[arg(long)]
    check_unique: bool,
    /// Guess-cell line rating: simple, adhoc or math
    #[arg(long, default_value = "adhoc")]
    rating: String,
    /// Guess colour policy: max, min, random or contrast
    #[arg(long, default_value = "contrast")]
    color: String,
    /// Seed for the random colour policy
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let text = match &args.puzzle {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("{}: {e}", path.display());
            exit(1);
        }),
        None => {
            let mut buf = String::new();
            stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
                eprintln!("stdin: {e}");
                exit(1);
            });
            buf
        }
    };

    let puzzle = nonogram_solver::parse_puzzle(&text).unwrap_or_else(|e| {
        eprintln!("bad puzzle: {e}");
        exit(1);
    });

    let config = Config {
        probe: !args.no_probe,
        probe_level: args.probe_level,
        merge: !args.no_merge,
        backtrack: !args.no_backtrack,
        exhaust: !args.no_exhaust,
        check_unique: args.check_unique,
        rating: args.rating.parse().unwrap_or_else(|e| {
            eprintln!("{e}");
            exit(1);
        }),
        color: args.color.parse().unwrap_or_else(|e| {
            eprintln!("{e}");
            exit(1);
        }),
        seed: args.seed,
        ..Config::default()
    };

    let mut solver = Solver::new(puzzle, config);
    let report = solver.solve();
    match report.verdict {
        Verdict::Solved => {
            for solution in &report.solutions {
                println!("{solution}");
            }
            match report.unique {
                Some(true) => println!("unique"),
                Some(false) => println!("not unique"),
                None => {}
            }
        }
        Verdict::Unsat => println!("no solution"),
        Verdict::Stuck => println!("stuck"),
    }
    if args.stats {
        eprintln!("{:?}", solver.stats());
    }
}
