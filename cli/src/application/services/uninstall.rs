//! Application service: the uninstall use-case.
//!
//! Every removal is best effort: a failure is reported as a warning and the
//! remaining removals still run. The state entry is always dropped.

use anyhow::Result;

use crate::application::ports::{ProgressReporter, Transport};
use crate::application::services::runtime::{app_dir, compose_down};
use crate::application::services::state_store::{load_state, save_state};
use crate::application::services::{mesh, proxy};
use crate::domain::shell::quote;

fn best_effort(reporter: &impl ProgressReporter, result: Result<()>, done: &str, failed: &str) {
    match result {
        Ok(()) => reporter.success(done),
        Err(e) => reporter.warn(&format!("{failed}: {e:#}")),
    }
}

/// Remove `name` from the target.
///
/// With `purge`, the app's volumes are removed as well.
///
/// # Errors
///
/// Returns [`crate::domain::error::StateError::NotInstalled`] for an unknown
/// recipe, or an error if state cannot be loaded or saved.
pub async fn uninstall(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    name: &str,
    purge: bool,
) -> Result<()> {
    let mut state = load_state(transport).await?;
    let installed = state.recipe(name)?.clone();

    reporter.header(&format!("Uninstalling {name}..."));

    best_effort(
        reporter,
        compose_down(transport, name, purge).await,
        "Containers stopped",
        "Failed to stop containers",
    );

    if installed.private {
        best_effort(
            reporter,
            mesh::remove_serve(transport, installed.port).await,
            "Tailscale serve removed",
            "Failed to remove Tailscale serve",
        );
    } else {
        best_effort(
            reporter,
            proxy::remove_site(transport, name).await,
            "Caddy config removed",
            "Failed to remove Caddy config",
        );
        if let Err(e) = proxy::reload(transport).await {
            reporter.warn(&format!("Caddy reload failed: {e:#}"));
        }
    }

    let removed = transport
        .run(&format!("rm -rf {}", quote(&app_dir(name))))
        .await
        .map(drop);
    best_effort(reporter, removed, "Files removed", "Failed to remove directory");

    state.recipes.remove(name);
    save_state(transport, &state).await
}
