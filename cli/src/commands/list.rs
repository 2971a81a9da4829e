//! `bunkr list`: show the published recipe index.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::RecipeSource;
use crate::domain::recipe::parse_index;
use crate::output::progress::with_spinner;

/// Run `bunkr list`.
///
/// # Errors
///
/// Returns an error if the index cannot be fetched or parsed.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let source = app.recipe_source();
    let data = with_spinner(&app.output, "Fetching recipes...", source.fetch_index()).await?;
    let entries = parse_index(&data)?;
    app.renderer().list(&entries)?;
    Ok(ExitCode::SUCCESS)
}
