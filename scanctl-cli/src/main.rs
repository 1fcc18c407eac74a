mod cli;
mod commands;

use std::process;

use anyhow::Result;
use clap::Parser;
use colored::*;
use scan_console::credentials::CredentialPair;
use scan_console::{Console, ConsoleConfig, logging};
use tracing::error;

use crate::cli::Args;

const VERBOSE_LOG_FILTER: &str = "scan_console=debug,scanctl=debug";

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = ConsoleConfig::from_env();
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url)?;
    }
    if args.json_logs {
        config.log_json = true;
    }

    // Keep the guard alive so file logs flush on exit.
    let (log_handle, _guard) = logging::init_logging(&config)?;
    if args.verbose {
        // Reloaded after init so it also overrides RUST_LOG.
        log_handle.set_filter(VERBOSE_LOG_FILTER)?;
    }

    let console = Console::new(&config)?;
    if let Some(access_token) = args.access_token {
        console.sign_in(CredentialPair::new(access_token, args.refresh_token));
    }

    commands::execute(&console, args.command).await
}
