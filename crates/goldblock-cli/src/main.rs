//! `goldblock`: debugging utilities for the provenance harness.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `goldblock=info`). Command output goes to stdout.

mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command};
use crate::output::Formatter;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "goldblock=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref(), cli.ledger)?;
    let formatter = Formatter::new(cli.format);

    let output = match cli.command {
        Command::Sign(args) => commands::execute_sign(&args, &config, &formatter)?,
        Command::Submit(args) => commands::execute_submit(&args, config, &formatter).await?,
        Command::Fetch { index } => commands::execute_fetch(index, config, &formatter).await?,
        Command::Ancestors { index } => {
            commands::execute_ancestors(index, config, &formatter).await?
        }
        Command::Verify => commands::execute_verify(config, &formatter).await?,
    };

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
