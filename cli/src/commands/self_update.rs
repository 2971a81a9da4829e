//! `bunkr self-update`: replace this binary with the latest release.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::self_update::{UpdateChecker, self_update};

/// Arguments for the self-update command.
#[derive(Args)]
pub struct SelfUpdateArgs {
    /// Check for updates without applying them
    #[arg(long)]
    pub check: bool,
}

/// Run `bunkr self-update`.
///
/// # Errors
///
/// Returns an error if the release check, download, checksum or binary
/// replacement fails.
pub async fn run(
    app: &AppContext,
    args: &SelfUpdateArgs,
    checker: &impl UpdateChecker,
) -> Result<ExitCode> {
    let reporter = app.reporter();
    // The release backend does blocking HTTP.
    let outcome = tokio::task::block_in_place(|| {
        self_update(checker, &reporter, env!("CARGO_PKG_VERSION"), args.check)
    })?;
    app.renderer().self_update(&outcome)?;
    Ok(ExitCode::SUCCESS)
}
