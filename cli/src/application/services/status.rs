//! Application service: what is installed on the target and whether it runs.

use anyhow::Result;
use serde::Serialize;

use crate::application::ports::Transport;
use crate::application::services::runtime::{ContainerStatus, compose_ps};
use crate::application::services::state_store::load_state;
use crate::domain::state::{HardeningState, MeshState, RecipeState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppStatus {
    pub name: String,
    #[serde(flatten)]
    pub recipe: RecipeState,
    pub containers: Vec<ContainerStatus>,
}

impl AppStatus {
    /// One word for the app as a whole.
    ///
    /// `running` when every container runs, otherwise the first other state;
    /// `unknown` when `docker compose ps` listed nothing.
    #[must_use]
    pub fn summary(&self) -> &str {
        if self.containers.is_empty() {
            return "unknown";
        }
        self.containers
            .iter()
            .find(|c| c.state != "running")
            .map_or("running", |c| c.state.as_str())
    }
}

/// The state document plus live container states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub hardening: HardeningState,
    pub tailscale: MeshState,
    pub apps: Vec<AppStatus>,
}

/// Load state and ask the runtime about every installed app.
///
/// A failing `docker compose ps` leaves that app without containers.
///
/// # Errors
///
/// Returns an error if the state document cannot be loaded.
pub async fn collect_status(transport: &impl Transport) -> Result<StatusReport> {
    let state = load_state(transport).await?;
    let mut apps = Vec::with_capacity(state.recipes.len());
    for (name, recipe) in state.recipes {
        let containers = compose_ps(transport, &name).await.unwrap_or_else(|e| {
            tracing::debug!(app = %name, error = %e, "docker compose ps failed");
            Vec::new()
        });
        apps.push(AppStatus {
            name,
            recipe,
            containers,
        });
    }
    Ok(StatusReport {
        hardening: state.hardening,
        tailscale: state.mesh,
        apps,
    })
}
