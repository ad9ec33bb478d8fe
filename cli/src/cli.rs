//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Blue-green deploys on tsuru
#[derive(Parser)]
#[command(
    name = "tsuru-bluegreen",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true,
    after_help = "Configuration is read from a YAML file (tsuru-bluegreen.yaml). \
INI files (tsuru-bluegreen.ini) from earlier releases are no longer read and \
must be converted."
)]
pub struct Cli {
    /// Config file (default: ./tsuru-bluegreen.yaml)
    #[arg(short, long, global = true, env = "TSURU_BLUEGREEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy a tag to the idle slot
    Pre(commands::pre::PreArgs),

    /// Move live traffic to the idle slot
    Swap,

    /// Show which slot is live
    #[command(visible_alias = "status")]
    Cname(commands::status::StatusArgs),
}

impl Cli {
    /// Execute the CLI command and return the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the control plane
    /// cannot be reached.
    pub async fn run(self) -> Result<i32> {
        let Cli {
            config,
            quiet,
            no_color,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            config,
        })?;
        match command {
            Command::Pre(args) => commands::pre::run(&args, &app).await,
            Command::Swap => commands::swap::run(&app).await,
            Command::Cname(args) => commands::status::run(&args, &app).await,
        }
    }
}
