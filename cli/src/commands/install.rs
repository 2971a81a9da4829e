//! `bunkr install`: harden if needed, then deploy one or more recipes.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::install::{InstallRequest, install};
use crate::domain::recipe::parse_presets;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Recipes to install, in order
    #[arg(required = true, value_name = "RECIPE")]
    pub recipes: Vec<String>,

    /// SSH port to move the daemon to if the server is not hardened yet [default: 2222]
    #[arg(long, env = "BUNKR_SSH_PORT")]
    pub ssh_port: Option<u16>,

    /// Answer a recipe prompt up front (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Never prompt; fail when a required answer is missing
    #[arg(short, long)]
    pub yes: bool,
}

/// Run `bunkr install`.
///
/// # Errors
///
/// Returns an error if planning fails, the server is unreachable, or a fatal
/// install step fails.
pub async fn run(app: &AppContext, args: &InstallArgs) -> Result<ExitCode> {
    let presets = parse_presets(&args.set)?;
    let hardening = app.hardening(args.ssh_port)?;
    let transport = app.transport().await?;
    let host = transport.display_host();
    let request = InstallRequest {
        names: &args.recipes,
        presets: &presets,
        hardening,
        host: &host,
    };

    let report = install(
        &transport,
        &app.recipe_source(),
        &app.prompter(),
        &app.reporter(),
        &request,
        &app.timings,
    )
    .await?;

    app.renderer().install(&report)?;
    Ok(ExitCode::SUCCESS)
}
