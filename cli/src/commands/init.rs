//! `bunkr init`: harden the server without installing anything.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::hardening::harden;
use crate::application::services::state_store::{load_state, save_state};

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// SSH port to move the daemon to [default: 2222]
    #[arg(long, env = "BUNKR_SSH_PORT")]
    pub ssh_port: Option<u16>,
}

/// Run `bunkr init`.
///
/// # Errors
///
/// Returns an error if the server is unreachable or a hardening step fails.
pub async fn run(app: &AppContext, args: &InitArgs) -> Result<ExitCode> {
    let config = app.hardening(args.ssh_port)?;
    let transport = app.transport().await?;
    let reporter = app.reporter();

    let mut state = load_state(&transport).await?;
    harden(
        &transport,
        &reporter,
        &mut state,
        &config,
        &transport.display_host(),
        &app.timings,
    )
    .await?;
    save_state(&transport, &state).await?;

    app.renderer().init(state.hardening.ssh_port)?;
    Ok(ExitCode::SUCCESS)
}
