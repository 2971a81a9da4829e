//! Application service: the install use-case.
//!
//! Plan everything first, then apply in a fixed order: hardening, shared
//! dependencies, one recipe at a time, a single Caddy reload, one state save.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::application::ports::{ProgressReporter, Prompter, RecipeSource, Transport};
use crate::application::services::hardening::{HardeningOutcome, harden};
use crate::application::services::plan::{PlannedRecipe, plan_install};
use crate::application::services::runtime::{
    compose_path, compose_up, ensure_docker, health_check, run_init, run_post_init,
    write_app_files,
};
use crate::application::services::state_store::{load_state, save_state};
use crate::application::services::{mesh, proxy};
use crate::domain::hardening::HardeningConfig;
use crate::domain::poll::Timings;
use crate::domain::recipe::{Answers, generate_compose, generate_env};
use crate::domain::state::{RecipeState, State};

/// What `install` was asked to do.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    pub names: &'a [String],
    /// Answers given with `--set`.
    pub presets: &'a Answers,
    pub hardening: HardeningConfig,
    /// Host name used in the post-hardening login hint.
    pub host: &'a str,
}

/// One app brought up by this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledApp {
    pub name: String,
    pub url: String,
    pub port: u16,
    pub private: bool,
}

#[derive(Debug, Default)]
pub struct InstallReport {
    /// Set when this run hardened the target.
    pub hardening: Option<HardeningOutcome>,
    pub apps: Vec<InstalledApp>,
}

/// Plan and install every requested recipe.
///
/// # Errors
///
/// Plan failures abort before the target is changed. After that, the first
/// fatal failure aborts the run; best-effort failures are reported as warnings.
pub async fn install(
    transport: &impl Transport,
    source: &impl RecipeSource,
    prompter: &impl Prompter,
    reporter: &impl ProgressReporter,
    request: &InstallRequest<'_>,
    timings: &Timings,
) -> Result<InstallReport> {
    let mut state = load_state(transport).await?;
    let plans = plan_install(
        source,
        prompter,
        reporter,
        request.names,
        request.presets,
        &state,
    )
    .await?;

    let hardening = if state.hardening.applied {
        None
    } else {
        Some(
            harden(
                transport,
                reporter,
                &mut state,
                &request.hardening,
                request.host,
                timings,
            )
            .await?,
        )
    };

    match deploy(transport, reporter, &mut state, &plans, timings).await {
        Ok(apps) => {
            save_state(transport, &state).await?;
            Ok(InstallReport { hardening, apps })
        }
        Err(e) => {
            if hardening.is_some() {
                if let Err(save) = save_state(transport, &state).await {
                    tracing::warn!(error = %save, "cannot persist hardening progress");
                }
            }
            Err(e)
        }
    }
}

async fn deploy(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    state: &mut State,
    plans: &[PlannedRecipe],
    timings: &Timings,
) -> Result<Vec<InstalledApp>> {
    reporter.step("Checking Docker...");
    ensure_docker(transport, reporter, timings).await?;
    reporter.success("Docker ready");

    let has_private = plans.iter().any(|p| p.recipe.private);
    let has_public = plans.iter().any(|p| !p.recipe.private);

    if has_private {
        reporter.step("Checking Tailscale...");
        mesh::ensure_connected(transport, reporter, &mut state.mesh, timings).await?;
        reporter.success("Tailscale ready");
    }
    if has_public {
        reporter.step("Checking Caddy...");
        proxy::ensure_installed(transport, reporter, timings).await?;
        reporter.success("Caddy ready");
    }

    let mut apps = Vec::with_capacity(plans.len());
    for plan in plans {
        apps.push(install_recipe(transport, reporter, state, plan, timings).await?);
    }

    if has_public {
        if let Err(e) = proxy::reload(transport).await {
            reporter.warn(&format!(
                "Caddy reload failed, run 'systemctl reload caddy' manually: {e:#}"
            ));
        }
    }
    Ok(apps)
}

async fn install_recipe(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    state: &mut State,
    plan: &PlannedRecipe,
    timings: &Timings,
) -> Result<InstalledApp> {
    let recipe = &plan.recipe;
    let name = recipe.name.as_str();
    reporter.header(&format!("Installing {name}..."));

    let container_port = recipe.primary_port();
    let port = state.allocate_port(container_port)?;
    let compose_yaml = generate_compose(recipe, &plan.values, port)?;
    write_app_files(transport, name, &compose_yaml, &generate_env(&plan.values)).await?;
    reporter.success("Compose file generated");

    let (domain, url) = if recipe.private {
        mesh::serve(transport, reporter, port, timings).await?;
        reporter.success("Tailscale serve configured");
        let hostname = state.mesh.hostname.clone();
        let url = mesh::access_url(&hostname, port);
        (hostname, url)
    } else {
        let domain = plan.domain().to_string();
        proxy::add_site(transport, name, &domain, port).await?;
        reporter.success("Caddy configured");
        let url = format!("https://{domain}");
        (domain, url)
    };

    if let Some(command) = &recipe.init_command {
        reporter.step("Running init...");
        if let Err(e) = run_init(transport, name, command).await {
            reporter.warn(&format!("Init command failed, continuing: {e:#}"));
        }
    }

    if !recipe.post_init.is_empty() {
        reporter.step("Running post-init...");
        run_post_init(transport, name, &recipe.post_init)
            .await
            .with_context(|| format!("post-init failed for {name}"))?;
        reporter.success("Post-init complete");
    }

    reporter.step("Starting containers...");
    if let Err(e) = compose_up(transport, name).await {
        reporter.error("Failed to start containers");
        reporter.step(&format!(
            "  Run: docker compose -f {} logs",
            compose_path(name)
        ));
        return Err(e.context(format!("failed to start {name}")));
    }
    reporter.success("Containers started");

    if let Some(check) = &recipe.health_check {
        match health_check(transport, check, container_port, port, timings).await {
            Ok(()) => reporter.success("Health check passed"),
            Err(e) => reporter.warn(&format!(
                "Health check failed, the app may still be starting: {e:#}"
            )),
        }
    }

    state.recipes.insert(
        name.to_string(),
        RecipeState {
            version: recipe.version.clone(),
            domain,
            private: recipe.private,
            installed_at: Some(Utc::now()),
            port,
            container_port,
        },
    );

    Ok(InstalledApp {
        name: name.to_string(),
        url,
        port,
        private: recipe.private,
    })
}
