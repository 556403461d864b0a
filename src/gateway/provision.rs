//! Gateway provisioning: image build/push, ensure-exists network and
//! firewall, instance creation.
//!
//! Every step is terminal on failure — nothing is retried, and a partially
//! created network (e.g. firewall rule creation failed after the network
//! was created) is left for the operator. The check-then-create sequence
//! for the network has no transactional guarantee against a concurrent
//! provisioner; single-operator usage is assumed.

use std::future::Future;
use std::io::Write as _;
use std::process::Output;

use crate::docker::ImageBuilder;
use crate::domain::error::ProvisionError;
use crate::domain::manifest::PodManifest;
use crate::domain::target::DeploymentTarget;
use crate::gcloud::Gcloud;
use crate::output::{OutputContext, progress};

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Ensures the reserved gateway network and its SSH firewall rule exist.
/// Returns `true` when the network was created by this call.
///
/// # Errors
///
/// Returns [`ProvisionError::Network`] or [`ProvisionError::Firewall`] when
/// the respective create call fails.
pub async fn ensure_network(
    gcloud: &impl Gcloud,
    target: &DeploymentTarget,
) -> Result<bool, ProvisionError> {
    let exists = gcloud
        .describe_network(target)
        .await
        .map(|o| o.status.success())
        .unwrap_or(false);
    if exists {
        return Ok(false);
    }

    let output = gcloud
        .create_network(target)
        .await
        .map_err(|e| ProvisionError::Network(e.to_string()))?;
    if !output.status.success() {
        return Err(ProvisionError::Network(stderr_of(&output)));
    }

    let output = gcloud
        .create_firewall_rule(target)
        .await
        .map_err(|e| ProvisionError::Firewall(e.to_string()))?;
    if !output.status.success() {
        return Err(ProvisionError::Firewall(stderr_of(&output)));
    }

    Ok(true)
}

/// Provisions a gateway VM named `instance` in `target`.
///
/// Builds and pushes the gateway image from `context_dir`, ensures the
/// network exists, then creates the VM with the generated pod manifest.
/// Prints a cost reminder on success: the VM is never auto-terminated and
/// must be deleted manually.
///
/// # Errors
///
/// Returns the [`ProvisionError`] kind of the step that failed.
pub async fn provision(
    gcloud: &impl Gcloud,
    images: &impl ImageBuilder,
    target: &DeploymentTarget,
    instance: &str,
    context_dir: &str,
    ctx: &OutputContext,
) -> Result<(), ProvisionError> {
    let image_ref = target.image_ref();

    run_step(ctx, &format!("Building image {image_ref}"), async {
        let output = images
            .build(context_dir, &image_ref)
            .await
            .map_err(|e| ProvisionError::Build(e.to_string()))?;
        if !output.status.success() {
            return Err(ProvisionError::Build(stderr_of(&output)));
        }
        Ok(())
    })
    .await?;

    run_step(ctx, "Pushing image", async {
        let output = images
            .push(&image_ref)
            .await
            .map_err(|e| ProvisionError::Push(e.to_string()))?;
        if !output.status.success() {
            return Err(ProvisionError::Push(stderr_of(&output)));
        }
        Ok(())
    })
    .await?;

    run_step(ctx, "Ensuring gateway network", async {
        ensure_network(gcloud, target).await.map(|_| ())
    })
    .await?;

    run_step(ctx, &format!("Creating instance {instance}"), async {
        let manifest = manifest_file(instance, &image_ref)?;
        let path = manifest.path().to_string_lossy().to_string();
        let output = gcloud
            .create_instance(target, instance, &path)
            .await
            .map_err(|e| ProvisionError::InstanceCreate(e.to_string()))?;
        if !output.status.success() {
            return Err(ProvisionError::InstanceCreate(stderr_of(&output)));
        }
        Ok(())
    })
    .await?;

    ctx.warn(&format!(
        "Instance {instance} keeps running (and billing) until you delete it:"
    ));
    ctx.kv(
        "Delete",
        &format!(
            "gcloud compute instances delete {instance} --zone {}",
            target.zone
        ),
    );
    Ok(())
}

/// Writes the generated pod manifest to a temp file kept alive for the
/// duration of the instance-create call.
fn manifest_file(instance: &str, image_ref: &str) -> Result<tempfile::NamedTempFile, ProvisionError> {
    let yaml = PodManifest::new(instance, image_ref)
        .to_yaml()
        .map_err(|e| ProvisionError::InstanceCreate(format!("rendering manifest: {e}")))?;
    let mut file = tempfile::NamedTempFile::new()
        .map_err(|e| ProvisionError::InstanceCreate(format!("creating manifest file: {e}")))?;
    file.write_all(yaml.as_bytes())
        .map_err(|e| ProvisionError::InstanceCreate(format!("writing manifest file: {e}")))?;
    Ok(file)
}

async fn run_step<F>(ctx: &OutputContext, msg: &str, fut: F) -> Result<(), ProvisionError>
where
    F: Future<Output = Result<(), ProvisionError>>,
{
    let pb = ctx.show_progress().then(|| progress::spinner(msg));
    let result = fut.await;
    match (&result, pb) {
        (Ok(()), Some(pb)) => progress::finish_ok(&pb, msg),
        (Ok(()), None) => ctx.success(msg),
        (Err(_), Some(pb)) => progress::finish_clear(&pb),
        (Err(_), None) => {}
    }
    result
}
