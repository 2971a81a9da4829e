//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags and the config file.
//! Commands get their reporter, prompter, recipe source and transport here.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::BunkrConfig;
use crate::domain::hardening::HardeningConfig;
use crate::domain::poll::Timings;
use crate::domain::target::SshTarget;
use crate::infra::prompt::DialoguerPrompter;
use crate::infra::recipes::HttpRecipeSource;
use crate::infra::transport::HostTransport;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Where commands run and where recipes come from.
pub struct TargetFlags {
    /// `--on [user@]host[:port]`; `None` means this machine.
    pub on: Option<String>,
    /// `--recipes-url`.
    pub recipes_url: Option<String>,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `BUNKR_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub target: TargetFlags,
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    ///
    /// Quiet in JSON mode so progress never mixes with the document on stdout.
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Contents of the config file, or defaults.
    pub config: BunkrConfig,
    /// Remote target; `None` runs against this machine.
    pub target: Option<SshTarget>,
    /// Base URL recipes are fetched from.
    pub recipes_url: String,
    /// When `true`, never prompt; answers come from `--set` and defaults.
    ///
    /// Set by `--yes` / `-y`, the `CI` or `BUNKR_YES` environment variables,
    /// or when there is no terminal to prompt on.
    pub non_interactive: bool,
    /// Poll pacing for remote waits.
    pub timings: Timings,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or `--on` does not
    /// parse as `[user@]host[:port]`.
    pub fn new(flags: &AppFlags, config_store: &impl ConfigStore) -> Result<Self> {
        let config = config_store.load()?;
        let target = flags
            .target
            .on
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(SshTarget::parse)
            .transpose()?;

        let ci_env = std::env::var("CI").is_ok() || std::env::var("BUNKR_YES").is_ok();
        let non_interactive =
            flags.behaviour.yes || ci_env || !console::user_attended_stderr();

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Ok(Self {
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            recipes_url: config.recipes_url(flags.target.recipes_url.as_deref()),
            config,
            target,
            non_interactive,
            timings: Timings::default(),
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    #[must_use]
    pub fn prompter(&self) -> DialoguerPrompter {
        DialoguerPrompter::new(!self.non_interactive)
    }

    #[must_use]
    pub fn recipe_source(&self) -> HttpRecipeSource {
        HttpRecipeSource::new(&self.recipes_url)
    }

    /// Hardening inputs with `--ssh-port` taking precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured admin user is not a valid name.
    pub fn hardening(&self, ssh_port: Option<u16>) -> Result<HardeningConfig> {
        Ok(self.config.hardening(ssh_port)?)
    }

    /// Fail unless there is a server to work on.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-Linux machine without `--on`.
    pub fn require_server(&self) -> Result<()> {
        require_server(self.target.as_ref(), std::env::consts::OS)
    }

    /// Open the transport for server commands.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no server to work on, or the SSH
    /// connection cannot be established.
    pub async fn transport(&self) -> Result<HostTransport> {
        self.require_server()?;
        HostTransport::open(self.target.as_ref()).await
    }
}

fn require_server(target: Option<&SshTarget>, os: &str) -> Result<()> {
    if target.is_none() && os != "linux" {
        anyhow::bail!(
            "--on flag is required on {os} (e.g., --on root@203.0.113.10)\n\n\
             bunkr server commands run on Linux. Use --on to target a remote server,\n\
             or run bunkr directly on a Linux machine."
        );
    }
    Ok(())
}
