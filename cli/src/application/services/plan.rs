//! Application service: the plan phase of an install.
//!
//! Fetches, validates and configures every requested recipe before anything
//! on the target is changed.

use std::collections::BTreeSet;

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, Prompter, RecipeSource};
use crate::domain::error::{RecipeError, StateError};
use crate::domain::recipe::{Answers, Recipe, expand_auto_generate, resolve_prompts};
use crate::domain::state::State;

/// A recipe ready to be applied, with its prompt answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRecipe {
    /// Manifest with auto-generated secrets already expanded.
    pub recipe: Recipe,
    pub values: Answers,
}

impl PlannedRecipe {
    /// Public domain for Caddy, from the `DOMAIN` answer.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.values.get("DOMAIN").map_or("", |d| d.trim())
    }
}

/// Fetch and validate one manifest.
///
/// # Errors
///
/// Returns a fetch, parse or validation error.
pub async fn fetch_recipe(source: &impl RecipeSource, name: &str) -> Result<Recipe> {
    let data = source
        .fetch(name)
        .await
        .with_context(|| format!("failed to fetch recipe {name}"))?;
    Ok(Recipe::load(name, &data)?)
}

/// Build the install plan for `names`, in request order.
///
/// Duplicate names and recipes already recorded in `state` are rejected
/// before anything is fetched.
///
/// # Errors
///
/// Returns the first fetch, validation or prompt failure.
pub async fn plan_install(
    source: &impl RecipeSource,
    prompter: &impl Prompter,
    reporter: &impl ProgressReporter,
    names: &[String],
    presets: &Answers,
    state: &State,
) -> Result<Vec<PlannedRecipe>> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(RecipeError::Duplicate(name.clone()).into());
        }
        if state.recipes.contains_key(name) {
            return Err(StateError::AlreadyInstalled(name.clone()).into());
        }
    }

    let mut plans = Vec::with_capacity(names.len());
    for name in names {
        reporter.header(&format!("Fetching {name}..."));
        let mut recipe = fetch_recipe(source, name).await?;
        if recipe.name != *name {
            tracing::debug!(requested = %name, manifest = %recipe.name, "recipe renamed by manifest");
            if state.recipes.contains_key(&recipe.name) {
                return Err(StateError::AlreadyInstalled(recipe.name).into());
            }
        }

        reporter.header(&format!("Configuring {}...", recipe.name));
        let values = resolve_prompts(&recipe.prompts, presets, |p| prompter.ask(p))?;

        recipe.environment = expand_auto_generate(&recipe.environment);
        for aux in &mut recipe.services {
            aux.environment = expand_auto_generate(&aux.environment);
        }

        let plan = PlannedRecipe { recipe, values };
        if !plan.recipe.private && plan.domain().is_empty() {
            return Err(RecipeError::MissingDomain(plan.recipe.name).into());
        }
        plans.push(plan);
    }
    Ok(plans)
}
