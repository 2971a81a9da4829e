//! Compile a recipe into a `docker-compose.yml` document.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use super::Recipe;
use super::env::expand_template;

const RESTART_POLICY: &str = "unless-stopped";

#[derive(Debug, Serialize)]
struct ComposeFile {
    services: BTreeMap<String, ComposeService>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    volumes: BTreeMap<String, Option<serde_yaml::Value>>,
}

#[derive(Debug, Serialize)]
struct ComposeService {
    image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    restart: &'static str,
}

/// Named volume declared by a `source:target` mount, if any.
///
/// Bind mounts (absolute, relative or home paths) are not declared.
fn named_volume(mount: &str) -> Option<&str> {
    let source = mount.split(':').next().unwrap_or_default();
    if source.is_empty() || source.starts_with(['/', '.', '~']) || !mount.contains(':') {
        None
    } else {
        Some(source)
    }
}

fn declare_volumes(
    mounts: &[String],
    declared: &mut BTreeMap<String, Option<serde_yaml::Value>>,
) {
    for name in mounts.iter().filter_map(|m| named_volume(m)) {
        declared.entry(name.to_string()).or_insert(None);
    }
}

fn expand_all(
    env: &BTreeMap<String, String>,
    values: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    env.iter()
        .map(|(k, v)| (k.clone(), expand_template(v, values)))
        .collect()
}

/// Render the compose document for `recipe`.
///
/// The primary service is named after the recipe and publishes its first
/// container port on `127.0.0.1:<host_port>`. Every auxiliary service is a
/// dependency of the primary one. Environment values are expanded against
/// `values`.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn generate_compose(
    recipe: &Recipe,
    values: &BTreeMap<String, String>,
    host_port: u16,
) -> Result<String> {
    let mut volumes = BTreeMap::new();
    let mut services = BTreeMap::new();

    declare_volumes(&recipe.volumes, &mut volumes);
    let primary = ComposeService {
        image: recipe.image.clone(),
        ports: recipe
            .ports
            .first()
            .map(|p| vec![format!("127.0.0.1:{host_port}:{p}")])
            .unwrap_or_default(),
        volumes: recipe.volumes.clone(),
        environment: expand_all(&recipe.environment, values),
        depends_on: recipe.services.iter().map(|s| s.name.clone()).collect(),
        restart: RESTART_POLICY,
    };
    services.insert(recipe.name.clone(), primary);

    for aux in &recipe.services {
        declare_volumes(&aux.volumes, &mut volumes);
        services.insert(
            aux.name.clone(),
            ComposeService {
                image: aux.image.clone(),
                ports: Vec::new(),
                volumes: aux.volumes.clone(),
                environment: expand_all(&aux.environment, values),
                depends_on: Vec::new(),
                restart: RESTART_POLICY,
            },
        );
    }

    serde_yaml::to_string(&ComposeFile { services, volumes })
        .context("failed to generate compose file")
}

/// Environment of service `service` in an existing compose document.
///
/// Used by `update` to carry previously generated secrets forward. Returns an
/// empty map if the document or the service cannot be read.
#[must_use]
pub fn service_environment(compose: &str, service: &str) -> BTreeMap<String, String> {
    let Ok(doc) = serde_yaml::from_str::<serde_yaml::Value>(compose) else {
        return BTreeMap::new();
    };
    doc.get("services")
        .and_then(|s| s.get(service))
        .and_then(|s| s.get("environment"))
        .and_then(|e| serde_yaml::from_value(e.clone()).ok())
        .unwrap_or_default()
}
