//! Trace timing simulator CLI.
//!
//! This binary is a thin driver around `tracesim-core`. It provides:
//! 1. **Run:** Load a JSON configuration and a JSON trace, simulate to completion,
//!    and print statistics as text sections or JSON.
//! 2. **Config:** Print the default configuration as JSON, as a starting point
//!    for a custom one.

use std::{fs, process};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tracesim_core::stats::STATS_SECTIONS;
use tracesim_core::{Config, InstructionRecord, Simulator};

#[derive(Parser, Debug)]
#[command(
    name = "tracesim",
    author,
    version,
    about = "Trace-driven out-of-order core timing simulator",
    long_about = "Replay an instruction trace through an out-of-order core model with a stream prefetch engine.\n\nThe trace is a JSON array of instruction records or one record per line.\nLog verbosity follows RUST_LOG (e.g. RUST_LOG=tracesim_core=debug).\n\nExamples:\n  tracesim run --trace loop.json\n  tracesim run --config oracle.json --trace loop.json --stats summary,stream\n  tracesim run --trace loop.json --json\n  tracesim config > default.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate a trace to completion.
    Run {
        /// JSON configuration; omitted fields take their defaults.
        #[arg(short, long)]
        config: Option<String>,

        /// JSON trace file.
        #[arg(short, long)]
        trace: String,

        /// Comma-separated statistics sections to print (default: all).
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,

        /// Print statistics as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON.
    Config,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            trace,
            stats,
            json,
        } => cmd_run(config.as_deref(), &trace, &stats, json),
        Commands::Config => cmd_config(),
    }
}

/// Loads config and trace, runs the simulation, and prints the statistics.
///
/// Exits with code 1 on unreadable input, an invalid configuration, a malformed
/// trace, or a fatal simulation error.
fn cmd_run(config_path: Option<&str>, trace_path: &str, sections: &[String], json: bool) {
    for s in sections {
        if !STATS_SECTIONS.contains(&s.as_str()) {
            fail(&format!(
                "unknown stats section `{s}` (expected one of: {})",
                STATS_SECTIONS.join(", ")
            ));
        }
    }

    let config = match config_path {
        Some(path) => Config::from_json(&read(path)).unwrap_or_else(|e| fail(&format!("{path}: {e}"))),
        None => Config::default(),
    };
    let records = parse_trace(&read(trace_path)).unwrap_or_else(|e| fail(&format!("{trace_path}: {e}")));
    info!(trace = trace_path, records = records.len(), "trace loaded");

    let mut sim = Simulator::with_timed_memory(config, records.into_iter())
        .unwrap_or_else(|e| fail(&e.to_string()));
    match sim.run() {
        Ok(stats) if json => match serde_json::to_string_pretty(&stats) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(&e.to_string()),
        },
        Ok(stats) => stats.print_sections(sections),
        Err(e) => {
            eprintln!("\n[!] FATAL: {e}");
            sim.stats().print_sections(sections);
            process::exit(1);
        }
    }
}

fn cmd_config() {
    match serde_json::to_string_pretty(&Config::default()) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&e.to_string()),
    }
}

/// Parses a JSON array of records, or one JSON record per line.
fn parse_trace(text: &str) -> Result<Vec<InstructionRecord>, serde_json::Error> {
    if text.trim_start().starts_with('[') {
        serde_json::from_str(text)
    } else {
        serde_json::Deserializer::from_str(text)
            .into_iter::<InstructionRecord>()
            .collect()
    }
}

fn read(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("error reading {path}: {e}")))
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}
