//! JSON output for `--json`.
//!
//! Successful commands print one pretty-printed document on stdout; a failed
//! command prints the error object from [`format_error`] instead.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::services::install::InstallReport;
use crate::application::services::self_update::SelfUpdateOutcome;
use crate::application::services::status::StatusReport;
use crate::application::services::update::UpdateOutcome;
use crate::domain::error::{
    ConfigError, PromptError, RecipeError, StateError, StepFailure, TimeoutError,
    TransportError,
};
use crate::domain::recipe::IndexEntry;

/// Renders command results as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &impl Serialize) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "version": version }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_list(&self, entries: &[IndexEntry]) -> Result<()> {
        Self::print(&serde_json::json!({ "recipes": entries }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_status(&self, report: &StatusReport) -> Result<()> {
        Self::print(report)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_install(&self, report: &InstallReport) -> Result<()> {
        Self::print(&serde_json::json!({
            "hardened": report.hardening.is_some(),
            "apps": report.apps,
        }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_update(&self, name: &str, outcome: &UpdateOutcome) -> Result<()> {
        let value = match outcome {
            UpdateOutcome::UpToDate { version } => serde_json::json!({
                "name": name,
                "updated": false,
                "version": version,
            }),
            UpdateOutcome::Updated { from, to } => serde_json::json!({
                "name": name,
                "updated": true,
                "from": from,
                "version": to,
            }),
        };
        Self::print(&value)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_uninstall(&self, name: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "name": name, "uninstalled": true }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_init(&self, ssh_port: u16) -> Result<()> {
        Self::print(&serde_json::json!({ "hardened": true, "ssh_port": ssh_port }))
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_self_update(&self, outcome: &SelfUpdateOutcome) -> Result<()> {
        let current = env!("CARGO_PKG_VERSION");
        let value = match outcome {
            SelfUpdateOutcome::UpToDate => serde_json::json!({
                "current": current,
                "update_available": false,
                "updated": false,
            }),
            SelfUpdateOutcome::Available { version } => serde_json::json!({
                "current": current,
                "latest": version,
                "update_available": true,
                "updated": false,
            }),
            SelfUpdateOutcome::Updated { version } => serde_json::json!({
                "previous": current,
                "version": version,
                "updated": true,
            }),
        };
        Self::print(&value)
    }
}

/// Machine-readable code for the outermost typed error in the chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if cause.is::<TransportError>() {
            return "transport";
        }
        if cause.is::<RecipeError>() {
            return "recipe";
        }
        if cause.is::<PromptError>() {
            return "prompt";
        }
        if cause.is::<TimeoutError>() {
            return "timeout";
        }
        if cause.is::<StepFailure>() {
            return "hardening";
        }
        if cause.is::<StateError>() {
            return "state";
        }
        if cause.is::<ConfigError>() {
            return "config";
        }
    }
    "error"
}

/// One-line message for the whole error chain.
///
/// Causes are joined with `": "` like `{:#}`. A cause spanning several lines,
/// such as a failed command with its captured output, keeps its first line and
/// its last non-empty line, which is where the tool usually says what went
/// wrong.
#[must_use]
pub fn error_message(err: &anyhow::Error) -> String {
    err.chain()
        .map(|cause| one_line(&cause.to_string()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(": ")
}

fn one_line(message: &str) -> String {
    let mut lines = message.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.last()) {
        (Some(first), Some(last)) => format!("{first}: {last}"),
        (Some(first), None) => first.to_string(),
        _ => String::new(),
    }
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
