//! bunkr - harden a VPS and deploy self-hosted apps in one command

#![cfg_attr(test, allow(clippy::expect_used))]

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bunkr_cli::cli::Cli;
use bunkr_cli::output::json::{error_code, error_message, format_error};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays clean for --json.
    let default_filter = if cli.verbose {
        "warn,bunkr=debug,bunkr_cli=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let json = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("{e:?}");
            let message = error_message(&e);
            match format_error(&message, error_code(&e)) {
                Ok(out) if json => println!("{out}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}
