//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags, TargetFlags};
use crate::commands;
use crate::infra::config::YamlConfigStore;
use crate::infra::update::GithubUpdateChecker;

/// Harden a VPS and deploy self-hosted apps in one command
#[derive(Parser)]
#[command(
    name = "bunkr",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Remote server to run on, e.g. root@203.0.113.10 or admin@host:2222
    #[arg(long, global = true, env = "BUNKR_ON", value_name = "TARGET")]
    pub on: Option<String>,

    /// Base URL recipes are fetched from
    #[arg(long, global = true, env = "BUNKR_RECIPES_URL", value_name = "URL")]
    pub recipes_url: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log every command sent to the server (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Harden the server
    Init(commands::init::InitArgs),

    /// Install one or more apps from recipes
    Install(commands::install::InstallArgs),

    /// List available recipes
    List,

    /// Show status of installed apps
    Status,

    /// Update an installed app to the latest recipe version
    Update(commands::update::UpdateArgs),

    /// Remove an installed app
    Uninstall(commands::uninstall::UninstallArgs),

    /// Update bunkr to the latest version
    SelfUpdate(commands::self_update::SelfUpdateArgs),

    /// Print bunkr version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            on,
            recipes_url,
            json,
            quiet,
            no_color,
            verbose: _,
            command,
        } = self;
        let yes = matches!(&command, Command::Install(args) if args.yes);
        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            target: TargetFlags { on, recipes_url },
            behaviour: BehaviourFlags { yes },
        };
        let app = AppContext::new(&flags, &YamlConfigStore)?;

        match command {
            Command::Init(args) => commands::init::run(&app, &args).await,
            Command::Install(args) => commands::install::run(&app, &args).await,
            Command::List => commands::list::run(&app).await,
            Command::Status => commands::status::run(&app).await,
            Command::Update(args) => commands::update::run(&app, &args).await,
            Command::Uninstall(args) => commands::uninstall::run(&app, &args).await,
            Command::SelfUpdate(args) => {
                commands::self_update::run(&app, &args, &GithubUpdateChecker).await
            }
            Command::Version => commands::version::run(&app),
        }
    }
}
