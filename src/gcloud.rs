//! Cloud CLI abstraction — enables test doubles for all `gcloud` calls.
//!
//! Every control-plane operation the tool performs goes through the
//! [`Gcloud`] trait; the production [`GcloudCli`] shells out to the `gcloud`
//! binary via a [`CommandRunner`], so unit tests inject canned outputs
//! instead of spawning processes.

use std::process::Output;

use anyhow::{Context, Result};

use crate::command_runner::{
    CommandRunner, DEFAULT_CMD_TIMEOUT, DEFAULT_MUTATE_TIMEOUT, TokioCommandRunner,
};
use crate::domain::target::DeploymentTarget;
use crate::gateway::{FIREWALL_RULE, NETWORK_NAME};

/// Abstraction over the `gcloud` CLI.
#[allow(async_fn_in_trait)]
pub trait Gcloud {
    /// Run `gcloud config get-value account` — the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn account(&self) -> Result<Output>;

    /// Run `gcloud compute instances list` filtered to names matching
    /// `pattern`, one instance name per stdout line, provider listing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn list_instances(&self, target: &DeploymentTarget, pattern: &str) -> Result<Output>;

    /// Run `gcloud compute networks describe` for the reserved gateway
    /// network. A zero exit status means the network exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn describe_network(&self, target: &DeploymentTarget) -> Result<Output>;

    /// Run `gcloud compute networks create` for the reserved gateway network.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn create_network(&self, target: &DeploymentTarget) -> Result<Output>;

    /// Run `gcloud compute firewall-rules create` permitting inbound SSH on
    /// the gateway network.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn create_firewall_rule(&self, target: &DeploymentTarget) -> Result<Output>;

    /// Run `gcloud compute instances create` with the pod manifest at
    /// `manifest_path` attached as instance metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn create_instance(
        &self,
        target: &DeploymentTarget,
        instance: &str,
        manifest_path: &str,
    ) -> Result<Output>;

    /// Run `gcloud compute ssh <instance> --command true`.
    ///
    /// A no-op remote command: forces SSH key propagation on first contact
    /// and verifies the instance is reachable before a tunnel is attempted.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    async fn ssh_noop(&self, target: &DeploymentTarget, instance: &str) -> Result<Output>;

    /// Spawn a background SSH session forwarding `<bridge>:<local_port>` to
    /// `localhost:<remote_port>` on the instance. Returns the child handle;
    /// the caller owns its lifetime (`kill_on_drop` is set as a safety net).
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn_tunnel(
        &self,
        target: &DeploymentTarget,
        instance: &str,
        bridge: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<tokio::process::Child>;
}

/// Production implementation — shells out to the `gcloud` binary.
///
/// Two runners are held: `cmd_runner` for short control-plane calls and
/// `mutate_runner` for slow mutations (instance create may take minutes).
pub struct GcloudCli<R: CommandRunner> {
    cmd_runner: R,
    mutate_runner: R,
}

impl<R: CommandRunner> GcloudCli<R> {
    /// Create a provisioner with explicit runner instances.
    pub fn new(cmd_runner: R, mutate_runner: R) -> Self {
        Self {
            cmd_runner,
            mutate_runner,
        }
    }
}

impl GcloudCli<TokioCommandRunner> {
    /// Convenience constructor for production use with default timeouts.
    #[must_use]
    pub fn default_runner() -> Self {
        Self {
            cmd_runner: TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            mutate_runner: TokioCommandRunner::new(DEFAULT_MUTATE_TIMEOUT),
        }
    }
}

impl<R: CommandRunner> Gcloud for GcloudCli<R> {
    async fn account(&self) -> Result<Output> {
        self.cmd_runner
            .run("gcloud", &["config", "get-value", "account"])
            .await
            .context("failed to run gcloud config get-value account")
    }

    async fn list_instances(&self, target: &DeploymentTarget, pattern: &str) -> Result<Output> {
        let filter = format!("name~{pattern}");
        self.cmd_runner
            .run(
                "gcloud",
                &[
                    "compute",
                    "instances",
                    "list",
                    "--project",
                    &target.project,
                    "--zones",
                    &target.zone,
                    "--filter",
                    &filter,
                    "--format",
                    "value(name)",
                ],
            )
            .await
            .context("failed to run gcloud compute instances list")
    }

    async fn describe_network(&self, target: &DeploymentTarget) -> Result<Output> {
        self.cmd_runner
            .run(
                "gcloud",
                &[
                    "compute",
                    "networks",
                    "describe",
                    NETWORK_NAME,
                    "--project",
                    &target.project,
                    "--format",
                    "value(name)",
                ],
            )
            .await
            .context("failed to run gcloud compute networks describe")
    }

    async fn create_network(&self, target: &DeploymentTarget) -> Result<Output> {
        self.mutate_runner
            .run(
                "gcloud",
                &[
                    "compute",
                    "networks",
                    "create",
                    NETWORK_NAME,
                    "--project",
                    &target.project,
                ],
            )
            .await
            .context("failed to run gcloud compute networks create")
    }

    async fn create_firewall_rule(&self, target: &DeploymentTarget) -> Result<Output> {
        self.mutate_runner
            .run(
                "gcloud",
                &[
                    "compute",
                    "firewall-rules",
                    "create",
                    FIREWALL_RULE,
                    "--project",
                    &target.project,
                    "--network",
                    NETWORK_NAME,
                    "--allow",
                    "tcp:22",
                ],
            )
            .await
            .context("failed to run gcloud compute firewall-rules create")
    }

    async fn create_instance(
        &self,
        target: &DeploymentTarget,
        instance: &str,
        manifest_path: &str,
    ) -> Result<Output> {
        let metadata = format!("google-container-manifest={manifest_path}");
        self.mutate_runner
            .run(
                "gcloud",
                &[
                    "compute",
                    "instances",
                    "create",
                    instance,
                    "--project",
                    &target.project,
                    "--zone",
                    &target.zone,
                    "--network",
                    NETWORK_NAME,
                    "--image-family",
                    "container-vm",
                    "--image-project",
                    "google-containers",
                    "--metadata-from-file",
                    &metadata,
                    "--scopes",
                    "cloud-platform",
                ],
            )
            .await
            .context("failed to run gcloud compute instances create")
    }

    async fn ssh_noop(&self, target: &DeploymentTarget, instance: &str) -> Result<Output> {
        self.mutate_runner
            .run(
                "gcloud",
                &[
                    "compute",
                    "ssh",
                    instance,
                    "--project",
                    &target.project,
                    "--zone",
                    &target.zone,
                    "--quiet",
                    "--command",
                    "true",
                ],
            )
            .await
            .context("failed to run gcloud compute ssh")
    }

    fn spawn_tunnel(
        &self,
        target: &DeploymentTarget,
        instance: &str,
        bridge: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<tokio::process::Child> {
        let forward = format!("{bridge}:{local_port}:localhost:{remote_port}");
        self.cmd_runner
            .spawn(
                "gcloud",
                &[
                    "compute",
                    "ssh",
                    instance,
                    "--project",
                    &target.project,
                    "--zone",
                    &target.zone,
                    "--quiet",
                    "--",
                    "-N",
                    "-L",
                    &forward,
                ],
            )
            .context("failed to spawn gcloud compute ssh tunnel")
    }
}
