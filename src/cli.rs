//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::output::OutputContext;

/// Provision and tunnel to cloud kernel gateways
#[derive(Parser)]
#[command(
    name = "kgate",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip interactive prompts (also set by CI / KGATE_YES env vars)
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build, push, and create a gateway VM
    Provision(commands::provision::ProvisionArgs),

    /// Tunnel to your gateway (creating it if needed) and run a command
    Connect(commands::connect::ConnectArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` maps typed domain errors to
    /// distinct exit codes.
    pub async fn run(self) -> Result<()> {
        let Cli {
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let ctx = OutputContext::new(no_color, quiet);
        let ci_env = std::env::var("CI").is_ok() || std::env::var("KGATE_YES").is_ok();
        let non_interactive = yes || ci_env;

        match command {
            Command::Provision(args) => {
                commands::provision::run(&ctx, &args, non_interactive).await
            }
            Command::Connect(args) => commands::connect::run(&ctx, &args).await,
            Command::Version => commands::version::run(),
        }
    }
}
