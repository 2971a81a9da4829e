//! `bunkr status`: installed apps, container state and hardening summary.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::status::collect_status;
use crate::output::progress::with_spinner;

/// Run `bunkr status`.
///
/// # Errors
///
/// Returns an error if the server is unreachable or its state is unreadable.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let transport = app.transport().await?;
    let report = with_spinner(&app.output, "Reading server state...", collect_status(&transport))
        .await?;
    app.renderer().status(&report)?;
    Ok(ExitCode::SUCCESS)
}
