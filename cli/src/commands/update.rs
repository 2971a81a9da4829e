//! `bunkr update`: move an installed app to its latest recipe version.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::update::update;

/// Arguments for the update command.
#[derive(Args)]
pub struct UpdateArgs {
    /// Installed recipe to update
    pub recipe: String,
}

/// Run `bunkr update`.
///
/// # Errors
///
/// Returns an error if the recipe is not installed or a step fails.
pub async fn run(app: &AppContext, args: &UpdateArgs) -> Result<ExitCode> {
    let transport = app.transport().await?;
    let outcome = update(
        &transport,
        &app.recipe_source(),
        &app.reporter(),
        &args.recipe,
    )
    .await?;
    app.renderer().update(&args.recipe, &outcome)?;
    Ok(ExitCode::SUCCESS)
}
