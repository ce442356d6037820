mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{address, replay, AddressArgs, ReplayArgs};
use markweave_daemon::{DaemonConfig, LogLevel};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Markweave CLI - replay edit scripts through the capture daemon
#[derive(Parser, Debug)]
#[command(name = "markweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding markweave.config.json (defaults to current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply an edit script to a document and print the canonical HTML
    Replay(ReplayArgs),

    /// Resolve a node address, or list every address in a document
    Address(AddressArgs),
}

fn init_tracing(level: LogLevel) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_dir = match cli.config {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let config = DaemonConfig::load(&config_dir)?;
    init_tracing(config.log_level);

    match cli.command {
        Command::Replay(args) => replay(args, config),
        Command::Address(args) => address(args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
