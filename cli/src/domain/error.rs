//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Transport errors ──────────────────────────────────────────────────────────

/// Errors raised while talking to the target machine.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("command failed ({}): {command}{}", exit_label(*.code), detail_suffix(.stderr, .stdout))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("invalid target '{0}': expected [user@]host[:port]")]
    InvalidTarget(String),

    #[error(
        "no SSH authentication available: load a key into ssh-agent or create ~/.ssh/id_ed25519"
    )]
    NoSshAuth,

    #[error("cannot connect to {target}: {detail}")]
    Connect { target: String, detail: String },

    #[error("cannot write {path}: {detail}")]
    WriteFile { path: String, detail: String },

    #[error("cannot read {path}: {detail}")]
    ReadFile { path: String, detail: String },
}

fn exit_label(code: Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| format!("exit {c}"))
}

fn detail_suffix(stderr: &str, stdout: &str) -> String {
    let detail = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if detail.is_empty() {
        String::new()
    } else {
        format!("\n{detail}")
    }
}

// ── Recipe errors ─────────────────────────────────────────────────────────────

/// A structurally valid manifest that is missing required content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("recipe {0} is required")]
    MissingField(&'static str),

    #[error("recipe must expose at least one port")]
    NoPorts,
}

/// Errors related to fetching and reading recipe manifests.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("invalid recipe YAML for {name}: {detail}")]
    Parse { name: String, detail: String },

    #[error("recipe {name} is invalid: {source}")]
    Validation {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("cannot fetch {url}: {detail}")]
    Fetch { url: String, detail: String },

    #[error("recipe '{0}' not found. Run 'bunkr list' to see available recipes.")]
    NotFound(String),

    #[error("recipe '{0}' was requested more than once")]
    Duplicate(String),

    #[error("recipe {0} is public and needs a DOMAIN answer")]
    MissingDomain(String),
}

// ── Prompt errors ─────────────────────────────────────────────────────────────

/// Errors raised while collecting answers for recipe prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("{label} is required")]
    Required { key: String, label: String },

    #[error("{label} is required (pass --set {key}=<value> when running non-interactively)")]
    MissingAnswer { key: String, label: String },

    #[error("invalid --set value '{0}': expected KEY=VALUE")]
    InvalidPreset(String),

    #[error("prompt failed: {0}")]
    Interaction(String),
}

// ── Polling errors ────────────────────────────────────────────────────────────

/// A bounded wait ran out of attempts.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("timed out waiting for {what} (waited {waited_secs} seconds)")]
pub struct TimeoutError {
    pub what: String,
    pub waited_secs: u64,
}

// ── Hardening errors ──────────────────────────────────────────────────────────

/// A hardening step's apply failed; later steps were not attempted.
#[derive(Debug, Error)]
#[error("{label} failed: {detail}")]
pub struct StepFailure {
    pub step: String,
    pub label: String,
    pub detail: String,
}

// ── State errors ──────────────────────────────────────────────────────────────

/// Errors related to the persisted state document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("recipe {0} is not installed")]
    NotInstalled(String),

    #[error("recipe {0} is already installed. Use 'bunkr update {0}' or 'bunkr uninstall {0}'.")]
    AlreadyInstalled(String),

    #[error("no free host port at or above {0}")]
    NoFreePort(u16),

    #[error("state file {path} is corrupt: {detail}")]
    Corrupt { path: String, detail: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Values from `~/.bunkr/config.yaml` that cannot be used as given.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "invalid admin_user '{0}': use a lowercase POSIX user name (letters, digits, '_' or '-', at most 32 characters)"
    )]
    InvalidAdminUser(String),
}
