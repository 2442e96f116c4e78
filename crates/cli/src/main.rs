// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kl - exercise fair distributed locks from the command line

mod commands;
mod completions;
mod config;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config as config_cmd, contend};
use completions::CompletionsArgs;
use output::OutputFormat;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(
    name = "kl",
    version,
    about = "kl - Fair distributed locks over a coordination service"
)]
struct Cli {
    /// Config file (defaults to ./kl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log lock activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run contenders against one lock and report the outcome
    Contend(contend::ContendArgs),
    /// Print the effective configuration
    Config(config_cmd::ConfigArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Commands::Completions(args) = &cli.command {
        completions::generate_completions::<Cli>(args.shell);
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let config = CliConfig::load(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Contend(args) => {
            let config = config.apply(args.overrides());
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nCancelling waiting contenders...");
                token.cancel();
            })?;

            let report = contend::run(&config, cancel).await?;
            output::print(&report, OutputFormat::from_json_flag(args.json))?;
        }
        Commands::Config(args) => config_cmd::handle(&args, config)?,
        Commands::Completions(_) => {}
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
