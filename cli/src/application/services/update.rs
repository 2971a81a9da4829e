//! Application service: update an installed app to the latest manifest.
//!
//! The host port, previous answers and previously generated secrets are all
//! kept, so the app's URL and data survive the update.

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, RecipeSource, Transport};
use crate::application::services::plan::fetch_recipe;
use crate::application::services::runtime::{
    compose_down, compose_path, compose_pull, compose_up, env_path, write_app_files,
};
use crate::application::services::state_store::{load_state, save_state};
use crate::domain::recipe::{
    carry_generated, generate_compose, generate_env, parse_env, service_environment,
};
use crate::domain::shell::quote;

/// Result of an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Installed version already matches the latest manifest.
    UpToDate { version: String },
    Updated { from: String, to: String },
}

async fn read_optional(transport: &impl Transport, path: &str) -> Result<Option<String>> {
    if !transport.check(&format!("test -f {}", quote(path))).await? {
        return Ok(None);
    }
    let bytes = transport.read_file(path).await?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Bring `name` to the latest published version.
///
/// # Errors
///
/// Returns [`crate::domain::error::StateError::NotInstalled`] for an unknown
/// recipe, or the first failing fetch, write or compose command.
pub async fn update(
    transport: &impl Transport,
    source: &impl RecipeSource,
    reporter: &impl ProgressReporter,
    name: &str,
) -> Result<UpdateOutcome> {
    let mut state = load_state(transport).await?;
    let current = state.recipe(name)?.clone();

    reporter.header(&format!("Checking for updates to {name}..."));
    let mut latest = fetch_recipe(source, name).await?;
    if latest.version == current.version {
        reporter.step(&format!(
            "{name} is already at version {}",
            current.version
        ));
        return Ok(UpdateOutcome::UpToDate {
            version: current.version,
        });
    }
    reporter.step(&format!(
        "Updating {name}: {} → {}",
        current.version, latest.version
    ));

    let mut values = read_optional(transport, &env_path(name))
        .await?
        .map(|text| parse_env(&text))
        .unwrap_or_default();
    if !current.domain.is_empty() {
        values
            .entry("DOMAIN".to_string())
            .or_insert_with(|| current.domain.clone());
    }

    let previous = read_optional(transport, &compose_path(name))
        .await?
        .unwrap_or_default();
    // Services are keyed by the installed name, the manifest may have renamed itself.
    latest.environment = carry_generated(
        &latest.environment,
        &service_environment(&previous, name),
    );
    for aux in &mut latest.services {
        aux.environment = carry_generated(&aux.environment, &service_environment(&previous, &aux.name));
    }
    latest.name = name.to_string();

    let compose_yaml = generate_compose(&latest, &values, current.port)?;
    write_app_files(transport, name, &compose_yaml, &generate_env(&values)).await?;
    reporter.success("Compose file regenerated");

    compose_pull(transport, name)
        .await
        .context("failed to pull images")?;
    reporter.success("Images pulled");

    compose_down(transport, name, false).await?;
    compose_up(transport, name).await?;
    reporter.success("Containers restarted");

    let entry = state
        .recipes
        .get_mut(name)
        .context("recipe disappeared from state")?;
    entry.version.clone_from(&latest.version);
    entry.container_port = latest.primary_port();
    save_state(transport, &state).await?;

    Ok(UpdateOutcome::Updated {
        from: current.version,
        to: latest.version,
    })
}
