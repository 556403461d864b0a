//! Session resolution — maps the caller's identity to a gateway instance,
//! provisioning one when the live scan finds nothing.

use anyhow::{Context, Result};

use crate::docker::ImageBuilder;
use crate::domain::error::ConnectError;
use crate::domain::session;
use crate::domain::target::DeploymentTarget;
use crate::gateway::provision;
use crate::gcloud::Gcloud;
use crate::output::OutputContext;

/// A gateway instance resolved for this session.
#[derive(Debug, PartialEq, Eq)]
pub struct ResolvedGateway {
    /// Instance name, matching `prefix-<digits>`.
    pub instance: String,
    /// Whether this call provisioned the instance.
    pub created: bool,
}

/// Resolves the caller's cloud identity.
///
/// # Errors
///
/// Returns [`ConnectError::Authentication`] when no account is configured
/// (empty output or the CLI's `(unset)` placeholder).
pub async fn identity(gcloud: &impl Gcloud) -> Result<String> {
    let output = gcloud.account().await?;
    let account = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || account.is_empty() || account == "(unset)" {
        return Err(ConnectError::Authentication.into());
    }
    Ok(account)
}

/// Scans the live instance listing for a gateway owned by `prefix`.
/// First listing row wins; there is no recency ordering.
///
/// # Errors
///
/// Returns an error if the listing call fails.
pub async fn find_gateway(
    gcloud: &impl Gcloud,
    target: &DeploymentTarget,
    prefix: &str,
) -> Result<Option<String>> {
    let pattern = format!("^{prefix}-[0-9]+$");
    let output = gcloud
        .list_instances(target, &pattern)
        .await
        .context("listing gateway instances")?;
    if !output.status.success() {
        anyhow::bail!(
            "listing gateway instances failed:\n{}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    // The filter already ran server-side; match again locally so a loose
    // provider filter can never hand us someone else's instance.
    Ok(session::first_match(prefix, stdout.lines().map(str::trim)))
}

/// Returns the gateway instance for `identity`, provisioning a new one with
/// a randomized name when no convention-matched instance exists.
///
/// # Errors
///
/// Returns [`ConnectError::Deploy`] when provisioning fails; listing errors
/// propagate as-is.
pub async fn resolve_gateway(
    gcloud: &impl Gcloud,
    images: &impl ImageBuilder,
    target: &DeploymentTarget,
    identity: &str,
    context_dir: &str,
    ctx: &OutputContext,
) -> Result<ResolvedGateway> {
    let prefix = session::instance_prefix(identity);

    if let Some(instance) = find_gateway(gcloud, target, &prefix).await? {
        return Ok(ResolvedGateway {
            instance,
            created: false,
        });
    }

    let instance = session::generate_instance_name(&prefix);
    provision::provision(gcloud, images, target, &instance, context_dir, ctx)
        .await
        .map_err(ConnectError::Deploy)?;
    Ok(ResolvedGateway {
        instance,
        created: true,
    })
}
