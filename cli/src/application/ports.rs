//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::config::BunkrConfig;
use crate::domain::error::{PromptError, TransportError};
use crate::domain::recipe::Prompt;

// ── Transport Port ────────────────────────────────────────────────────────────

/// Shell and file access to the machine being provisioned.
///
/// Calls carry no implicit timeout; bounded waits are explicit polls.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Run `command` with `sh -c` and capture its output.
    ///
    /// A non-zero exit status is returned in `Output`, not as an error.
    async fn exec(&self, command: &str) -> Result<Output>;

    /// Write `content` to `path` with permission bits `mode`, replacing any
    /// existing file. Parent directories are created.
    async fn write_file(&self, path: &str, content: &[u8], mode: u32) -> Result<()>;

    /// Read the whole file at `path`.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Run `command` and require exit status 0, returning stdout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandFailed`] on a non-zero exit.
    async fn run(&self, command: &str) -> Result<String> {
        let output = self.exec(command).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }
        Err(TransportError::CommandFailed {
            command: command.to_string(),
            code: output.status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into())
    }

    /// Run a probe and report whether it exited 0.
    async fn check(&self, command: &str) -> Result<bool> {
        Ok(self.exec(command).await?.status.success())
    }
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program, killing it if it outlives `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
}

// ── Recipe Source Port ────────────────────────────────────────────────────────

/// Where recipe manifests come from.
#[allow(async_fn_in_trait)]
pub trait RecipeSource {
    /// Raw manifest bytes for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::error::RecipeError::NotFound`] when the source
    /// has no such recipe, or a fetch error.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;
    /// Raw bytes of the recipe index.
    async fn fetch_index(&self) -> Result<Vec<u8>>;
}

// ── Prompt Port ───────────────────────────────────────────────────────────────

/// Asks the operator for recipe values.
pub trait Prompter {
    /// Ask for `prompt`, hiding input when it is secret.
    ///
    /// Returns `Ok(None)` when no interactive session is available.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Interaction`] when the terminal prompt fails.
    fn ask(&self, prompt: &Prompt) -> Result<Option<String>, PromptError>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait.
pub trait ProgressReporter {
    /// Start of a phase.
    fn header(&self, message: &str);
    /// An in-progress step or informational line.
    fn step(&self, message: &str);
    /// A step completed.
    fn success(&self, message: &str);
    /// A step was already in place.
    fn skip(&self, message: &str);
    /// Best-effort failure; the operation continues.
    fn warn(&self, message: &str);
    /// A failure about to abort the operation.
    fn error(&self, message: &str);
}

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Abstracts reading the user configuration file.
pub trait ConfigStore {
    /// Load the configuration, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<BunkrConfig>;

    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
