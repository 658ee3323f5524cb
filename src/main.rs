/*!
 * Command-line front end
 *
 * - analyze: list networks, conversations and usable handshakes of a capture
 * - generate: print the candidates built from one pair of seed words
 * - crack: dictionary attack against the first usable handshake
 */

mod cli;

use anyhow::Result;
use clap::Parser;
use colored::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{run_command, Args};

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr, generated candidates to stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run_command(args) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
