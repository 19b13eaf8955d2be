mod cli;
mod commands;

use std::path::Path;

use anyhow::Result;
use floodrisk::Config;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{dataset, hazard, rank, risk, vulnerability};

/// Logs go to stderr; command output (JSON) goes to stdout.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            Config::from_json_file(path)
        }
        None => Ok(Config::default()),
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Vulnerability(args) => vulnerability::run(&cli, args),
        Commands::Hazard(args) => hazard::run(&cli, args),
        Commands::Risk(args) => risk::run(&cli, args),
        Commands::Rank(args) => rank::run(&cli, args),
        Commands::Dataset(args) => dataset::run(&cli, args),
    }
}

fn main() -> Result<()> { run() }
