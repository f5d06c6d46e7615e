//! Parsergate - a terminal client for the vacancy parser backend.
//!
//! Register, log in and start the parser from an interactive shell. With
//! arguments, runs that single command and exits.

mod shell;

use std::io;

use anyhow::{Context, Result};
use parsergate_core::{Config, SessionClient};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shell::{Command, Shell};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn load_client() -> Result<SessionClient> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config file, using environment only");
            Config::default()
        }
    };
    let client_config = config
        .with_env()?
        .into_client_config()
        .context("Failed to configure backend connection")?;
    info!(base_url = client_config.base_url(), "Backend configured");

    SessionClient::new(client_config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--help") || args.first().map(String::as_str) == Some("-h") {
        println!("Usage: parsergate [command]\n\n{}", shell::HELP);
        return Ok(());
    }

    let client = load_client()?;
    let mut shell = Shell::new(client);

    if args.is_empty() {
        info!("Parsergate shell starting");
        shell.run().await?;
        info!("Parsergate shell exiting");
        return Ok(());
    }

    match Command::parse(&args.join(" ")) {
        Ok(Some(command)) => {
            shell.execute(command).await?;
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(msg) => Err(anyhow::anyhow!(msg)),
    }
}
