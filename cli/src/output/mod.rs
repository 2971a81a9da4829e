//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;

use crate::application::services::install::InstallReport;
use crate::application::services::self_update::SelfUpdateOutcome;
use crate::application::services::status::StatusReport;
use crate::application::services::update::UpdateOutcome;
use crate::domain::recipe::IndexEntry;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a skipped step prefixed with `⏭`. Suppressed when `quiet`.
    pub fn skip(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⏭".style(self.styles.warning));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print a progress line. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.info));
        }
    }

    /// Print a section header after a blank line. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a final result line framed by blank lines. Suppressed when `quiet`.
    pub fn result(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("  {}", msg.style(self.styles.result));
            println!();
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Renderer selected by the `--json` flag.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render_version(version),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn list(&self, entries: &[IndexEntry]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_list(entries);
                Ok(())
            }
            Self::Json(r) => r.render_list(entries),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn status(&self, report: &StatusReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_status(report);
                Ok(())
            }
            Self::Json(r) => r.render_status(report),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn install(&self, report: &InstallReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_install(report);
                Ok(())
            }
            Self::Json(r) => r.render_install(report),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn update(&self, name: &str, outcome: &UpdateOutcome) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_update(name, outcome);
                Ok(())
            }
            Self::Json(r) => r.render_update(name, outcome),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn uninstall(&self, name: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_uninstall(name);
                Ok(())
            }
            Self::Json(r) => r.render_uninstall(name),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn init(&self, ssh_port: u16) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_init();
                Ok(())
            }
            Self::Json(r) => r.render_init(ssh_port),
        }
    }

    /// Progress was already reported; only JSON mode prints a result.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn self_update(&self, outcome: &SelfUpdateOutcome) -> Result<()> {
        match self {
            Self::Human(_) => Ok(()),
            Self::Json(r) => r.render_self_update(outcome),
        }
    }
}
