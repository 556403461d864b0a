//! `kgate provision` — build, push, and create a gateway VM.

use anyhow::Result;
use clap::Args;

use crate::docker::DockerCli;
use crate::domain::error::ProvisionError;
use crate::domain::target::DeploymentTarget;
use crate::gateway::{self, provision as service};
use crate::gcloud::GcloudCli;
use crate::output::OutputContext;

/// Arguments for the provision command.
#[derive(Args)]
pub struct ProvisionArgs {
    /// Cloud project (defaults to the Cloud SDK's configured project)
    #[arg(long, env = "CLOUDSDK_CORE_PROJECT")]
    pub project: String,

    /// Compute zone (defaults to the Cloud SDK's configured zone)
    #[arg(long, env = "CLOUDSDK_COMPUTE_ZONE")]
    pub zone: String,

    /// Instance name
    #[arg(long, default_value = gateway::DEFAULT_INSTANCE)]
    pub name: String,

    /// Docker build context for the gateway image
    #[arg(long, default_value = ".")]
    pub context: String,
}

/// Run `kgate provision`.
///
/// Asks for confirmation (the created VM costs money and is never deleted
/// automatically); a decline cancels before any build, push, or create call.
///
/// # Errors
///
/// Returns [`ProvisionError`] for each failure kind; `main` maps it to the
/// corresponding exit code.
pub async fn run(ctx: &OutputContext, args: &ProvisionArgs, non_interactive: bool) -> Result<()> {
    let target = DeploymentTarget::new(&args.project, &args.zone);

    let prompt = format!(
        "Create gateway VM '{}' in project '{}' ({})? It will run until deleted",
        args.name, target.project, target.zone
    );
    if !confirm(&prompt, non_interactive)? {
        return Err(ProvisionError::Cancelled.into());
    }

    let gcloud = GcloudCli::default_runner();
    let docker = DockerCli::default_runner();
    service::provision(&gcloud, &docker, &target, &args.name, &args.context, ctx).await?;

    ctx.success(&format!("Gateway '{}' is up.", args.name));
    ctx.kv("Connect", "kgate connect -- <command>");
    Ok(())
}

/// Ask the user for confirmation. When `non_interactive` is `true` (CI,
/// `--yes` flag, or `KGATE_YES` env), returns `true` without prompting.
/// Without a TTY nobody can approve a paid resource, so a failed prompt
/// counts as a decline.
fn confirm(prompt: &str, non_interactive: bool) -> Result<bool> {
    if non_interactive {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false);
    Ok(confirmed)
}
