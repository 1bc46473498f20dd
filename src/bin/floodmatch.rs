//! Decode syndromes against a detector error model.
//!
//! Reads one syndrome per line on stdin (space-separated 0/1 per
//! detector), writes one line per shot on stdout: observable predictions
//! by default, matched detector pairs with `--pairs` (boundary as -1).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use floodmatch::Matching;

#[derive(Parser, Debug)]
#[command(name = "floodmatch")]
#[command(about = "MWPM decoder: decode syndromes against a detector error model")]
struct Args {
    /// Path to the detector error model file.
    dem: PathBuf,

    /// Print matched detector pairs instead of observable predictions.
    #[arg(long)]
    pairs: bool,
}

fn main() {
    let args = Args::parse();

    let dem_text = std::fs::read_to_string(&args.dem).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {e}", args.dem.display());
        exit(1);
    });
    let mut matching = Matching::from_dem(&dem_text).unwrap_or_else(|e| {
        eprintln!("failed to parse detector error model: {e}");
        exit(1);
    });

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = line.expect("stdin is readable");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let syndrome: Vec<u8> = line
            .split_whitespace()
            .map(|token| match token {
                "0" => 0,
                "1" => 1,
                other => {
                    eprintln!("syndrome values must be 0 or 1, got {other:?}");
                    exit(1);
                }
            })
            .collect();

        if args.pairs {
            match matching.decode_to_matched_pairs(&syndrome) {
                Ok(pairs) => {
                    let rendered: Vec<String> =
                        pairs.iter().map(|(a, b)| format!("{a}:{b}")).collect();
                    writeln!(out, "{}", rendered.join(" ")).expect("stdout is writable");
                }
                Err(e) => {
                    eprintln!("decode failed: {e}");
                    exit(1);
                }
            }
        } else {
            match matching.decode(&syndrome) {
                Ok(prediction) => {
                    let rendered: Vec<String> =
                        prediction.iter().map(|b| b.to_string()).collect();
                    writeln!(out, "{}", rendered.join(" ")).expect("stdout is writable");
                }
                Err(e) => {
                    eprintln!("decode failed: {e}");
                    exit(1);
                }
            }
        }
    }
}
