//! `RecipeSource` backed by static manifests served over HTTP.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::RecipeSource;
use crate::domain::error::RecipeError;

const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches `<base>/<name>.yaml` and `<base>/index.yaml`.
#[derive(Debug, Clone)]
pub struct HttpRecipeSource {
    base_url: String,
}

impl HttpRecipeSource {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn recipe_url(&self, name: &str) -> String {
        format!("{}/{name}.yaml", self.base_url)
    }

    #[must_use]
    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.base_url)
    }

    async fn get(url: String, not_found: Option<String>) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || get_blocking(&url, not_found))
            .await
            .context("spawn_blocking for recipe fetch")?
    }
}

fn get_blocking(url: &str, not_found: Option<String>) -> Result<Vec<u8>> {
    tracing::debug!(url, "fetching");
    let response = match ureq::get(url).timeout(FETCH_TIMEOUT).call() {
        Ok(response) => response,
        Err(e) => {
            if let (ureq::Error::Status(404, _), Some(name)) = (&e, not_found) {
                return Err(RecipeError::NotFound(name).into());
            }
            return Err(RecipeError::Fetch {
                url: url.to_string(),
                detail: e.to_string(),
            }
            .into());
        }
    };
    let mut data = Vec::new();
    response
        .into_reader()
        .take(MAX_MANIFEST_BYTES)
        .read_to_end(&mut data)
        .map_err(|e| RecipeError::Fetch {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
    Ok(data)
}

impl RecipeSource for HttpRecipeSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        Self::get(self.recipe_url(name), Some(name.to_string())).await
    }

    async fn fetch_index(&self) -> Result<Vec<u8>> {
        Self::get(self.index_url(), None).await
    }
}
