//! `bunkr uninstall`: stop an app and remove everything bunkr created for it.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::uninstall::uninstall;

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Installed recipe to remove
    pub recipe: String,

    /// Also remove the app's volumes (data)
    #[arg(long)]
    pub purge: bool,
}

/// Run `bunkr uninstall`.
///
/// # Errors
///
/// Returns an error if the recipe is not installed or state cannot be saved.
pub async fn run(app: &AppContext, args: &UninstallArgs) -> Result<ExitCode> {
    let transport = app.transport().await?;
    uninstall(&transport, &app.reporter(), &args.recipe, args.purge).await?;
    app.renderer().uninstall(&args.recipe)?;
    Ok(ExitCode::SUCCESS)
}
