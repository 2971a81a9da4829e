//! `Transport` for the machine bunkr itself runs on.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, Transport};
use crate::domain::error::TransportError;
use crate::infra::command_runner::TokioCommandRunner;

/// Runs commands with `sh -c` and writes files atomically.
#[derive(Debug, Clone, Default)]
pub struct LocalTransport {
    runner: TokioCommandRunner,
}

impl LocalTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Temp file in the target directory, then rename, so readers never see a
/// partial file.
fn write_atomic(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    use std::io::Write as _;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create temp file in {}", dir.display()))?;
    tmp.write_all(content).context("cannot write temp file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(mode))
            .context("cannot set permissions")?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("cannot replace {}", path.display()))?;
    Ok(())
}

impl Transport for LocalTransport {
    async fn exec(&self, command: &str) -> Result<Output> {
        tracing::debug!(target: "bunkr::transport", command, "local exec");
        self.runner.run("sh", &["-c", command]).await
    }

    async fn write_file(&self, path: &str, content: &[u8], mode: u32) -> Result<()> {
        tracing::debug!(target: "bunkr::transport", path, mode = %format!("{mode:o}"), "local write");
        let target = PathBuf::from(path);
        let content = content.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&target, &content, mode))
            .await
            .context("spawn_blocking for write_file")?
            .map_err(|e| {
                TransportError::WriteFile {
                    path: path.to_string(),
                    detail: format!("{e:#}"),
                }
                .into()
            })
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| {
            TransportError::ReadFile {
                path: path.to_string(),
                detail: e.to_string(),
            }
            .into()
        })
    }
}
