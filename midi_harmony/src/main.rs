// CLI entry point for the MIDI harmony analyzer.
//
// Analyzes every MIDI file in a directory and writes one JSON array with a
// record per song. See `analysis.rs` for the pipeline and `config.rs` for the
// configuration fields. Log output goes to stderr through `env_logger`
// (default level `info`, override with RUST_LOG).
//
// Usage:
//   analyze [OPTIONS]
//     -i, --input_dir <DIR>     Directory of MIDI files (default: .)
//     -o, --output_file <FILE>  Output JSON file (default: output.json)
//     -r, --resolution <N>      Sub-beats per beat (default: 4)
//     -c, --config <FILE>       JSON config file; other flags override it
//     --abort-on-error          Stop at the first unparseable file

use midi_harmony::{Analyzer, AnalyzerConfig, ParseFailurePolicy};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = parse_args();
    let analyzer = match Analyzer::new(config) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = analyzer.run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

/// Parse command-line arguments into an `AnalyzerConfig`. A `--config` file
/// is loaded before any other flag is applied, wherever it appears.
fn parse_args() -> AnalyzerConfig {
    let args: Vec<String> = std::env::args().collect();

    let mut config = AnalyzerConfig::default();
    if let Some(pos) = args.iter().position(|a| a == "-c" || a == "--config") {
        let Some(path) = args.get(pos + 1) else {
            eprintln!("--config requires a file path");
            std::process::exit(1);
        };
        config = AnalyzerConfig::load(&PathBuf::from(path)).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(1);
        });
    }

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-i" | "--input_dir" => {
                i += 1;
                config.input_dir = args.get(i).map(PathBuf::from).unwrap_or_else(|| {
                    eprintln!("--input_dir requires a directory");
                    std::process::exit(1);
                });
            }
            "-o" | "--output_file" => {
                i += 1;
                config.output_file = args.get(i).map(PathBuf::from).unwrap_or_else(|| {
                    eprintln!("--output_file requires a file path");
                    std::process::exit(1);
                });
            }
            "-r" | "--resolution" => {
                i += 1;
                config.resolution = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .filter(|&r: &u32| r > 0)
                    .unwrap_or_else(|| {
                        eprintln!("--resolution requires a positive integer");
                        std::process::exit(1);
                    });
            }
            "-c" | "--config" => {
                // Already loaded above.
                i += 1;
            }
            "--abort-on-error" => {
                config.on_parse_failure = ParseFailurePolicy::Abort;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: analyze [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --input_dir <DIR>     Directory of MIDI files (default: .)");
    println!("  -o, --output_file <FILE>  Output JSON file (default: output.json)");
    println!("  -r, --resolution <N>      Sub-beats per beat (default: 4)");
    println!("  -c, --config <FILE>       JSON config file; other flags override it");
    println!("  --abort-on-error          Stop at the first unparseable file");
    println!("  --help, -h                Show this help");
}
