//! `kgate connect` — resolve (or create) the caller's gateway, tunnel to it,
//! and run the dependent client against the local endpoint.

use anyhow::{Context, Result};
use clap::Args;

use crate::bridge;
use crate::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::docker::DockerCli;
use crate::domain::target::DeploymentTarget;
use crate::gateway::{self, resolve, tunnel};
use crate::gcloud::GcloudCli;
use crate::output::OutputContext;

/// Arguments for the connect command.
#[derive(Args)]
pub struct ConnectArgs {
    /// Cloud project (defaults to the Cloud SDK's configured project)
    #[arg(long, env = "CLOUDSDK_CORE_PROJECT")]
    pub project: String,

    /// Compute zone (defaults to the Cloud SDK's configured zone)
    #[arg(long, env = "CLOUDSDK_COMPUTE_ZONE")]
    pub zone: String,

    /// Local bridge address for the tunnel endpoint (auto-detected from
    /// the docker0 interface when omitted)
    #[arg(long)]
    pub bridge: Option<String>,

    /// Docker build context, used only when a gateway must be provisioned
    #[arg(long, default_value = ".")]
    pub context: String,

    /// Client command to run against the tunnel endpoint
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Run `kgate connect -- <command...>`.
///
/// Holds the tunnel for exactly as long as the client process runs; the
/// forwarding process is terminated on client exit, on error, and on
/// Ctrl-C.
///
/// # Errors
///
/// Returns `ConnectError` kinds for authentication, deployment, and
/// reachability failures; client spawn errors propagate as-is.
pub async fn run(ctx: &OutputContext, args: &ConnectArgs) -> Result<()> {
    let target = DeploymentTarget::new(&args.project, &args.zone);
    let gcloud = GcloudCli::default_runner();
    let docker = DockerCli::default_runner();

    let identity = resolve::identity(&gcloud).await?;
    let resolved =
        resolve::resolve_gateway(&gcloud, &docker, &target, &identity, &args.context, ctx)
            .await?;
    if resolved.created {
        ctx.info(&format!("Provisioned gateway '{}'.", resolved.instance));
    } else {
        ctx.info(&format!("Using gateway '{}'.", resolved.instance));
    }

    tunnel::verify_reachable(&gcloud, &target, &resolved.instance).await?;

    let bridge_addr = match &args.bridge {
        Some(addr) => addr.clone(),
        None => bridge::detect(&TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT)).await,
    };

    let session =
        tunnel::TunnelSession::establish(&gcloud, &target, &resolved.instance, &bridge_addr)
            .await?;
    ctx.kv("Gateway", session.endpoint());

    let status = run_client(&args.command, session.endpoint()).await;
    session.terminate().await?;

    match status? {
        Some(status) if !status.success() => {
            anyhow::bail!("client command exited with {status}")
        }
        Some(_) => Ok(()),
        None => anyhow::bail!("Interrupted."),
    }
}

/// Runs the dependent client with the tunnel endpoint in its environment,
/// inherited stdio, until it exits or Ctrl-C arrives. Returns `None` on
/// interrupt.
async fn run_client(
    command: &[String],
    endpoint: &str,
) -> Result<Option<std::process::ExitStatus>> {
    let (program, rest) = command
        .split_first()
        .context("client command cannot be empty")?;
    let mut child = tokio::process::Command::new(program)
        .args(rest)
        .env(gateway::CLIENT_URL_ENV, endpoint)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    tokio::select! {
        status = child.wait() => {
            Ok(Some(status.with_context(|| format!("waiting for {program}"))?))
        }
        _ = tokio::signal::ctrl_c() => {
            let _ = child.kill().await;
            Ok(None)
        }
    }
}
