//! Declarative pod manifest for the gateway VM.
//!
//! The instance is created with a single-container pod description passed via
//! instance metadata. One container, the pushed image reference, container
//! port 8080 mapped to host port 8080, and one environment variable telling
//! the contained service it is running on a cloud VM.

use serde::Serialize;

use crate::gateway::{GATEWAY_ENV_NAME, GATEWAY_ENV_VALUE, GATEWAY_PORT};

/// Top-level pod manifest, rendered to YAML for
/// `--metadata-from-file google-container-manifest=<file>`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodManifest {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata,
    spec: PodSpec,
}

#[derive(Debug, Serialize)]
struct Metadata {
    name: String,
}

#[derive(Debug, Serialize)]
struct PodSpec {
    containers: Vec<Container>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Container {
    name: String,
    image: String,
    image_pull_policy: &'static str,
    ports: Vec<PortMapping>,
    env: Vec<EnvVar>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortMapping {
    name: &'static str,
    container_port: u16,
    host_port: u16,
}

#[derive(Debug, Serialize)]
struct EnvVar {
    name: &'static str,
    value: &'static str,
}

impl PodManifest {
    /// Builds the manifest for `instance` running `image_ref`.
    #[must_use]
    pub fn new(instance: &str, image_ref: &str) -> Self {
        Self {
            api_version: "v1",
            kind: "Pod",
            metadata: Metadata {
                name: instance.to_string(),
            },
            spec: PodSpec {
                containers: vec![Container {
                    name: instance.to_string(),
                    image: image_ref.to_string(),
                    image_pull_policy: "Always",
                    ports: vec![PortMapping {
                        name: "gateway",
                        container_port: GATEWAY_PORT,
                        host_port: GATEWAY_PORT,
                    }],
                    env: vec![EnvVar {
                        name: GATEWAY_ENV_NAME,
                        value: GATEWAY_ENV_VALUE,
                    }],
                }],
            },
        }
    }

    /// Renders the manifest as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (it cannot for this shape;
    /// kept fallible to avoid a panic path in non-test code).
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn rendered() -> String {
        PodManifest::new("kgate-fc2398a73dd5-00042", "gcr.io/acme/kgate-gateway")
            .to_yaml()
            .expect("serialize")
    }

    #[test]
    fn test_manifest_is_a_single_container_pod() {
        let yaml = rendered();
        assert!(yaml.contains("kind: Pod"), "got:\n{yaml}");
        assert_eq!(yaml.matches("image:").count(), 1, "got:\n{yaml}");
    }

    #[test]
    fn test_manifest_embeds_image_reference() {
        let yaml = rendered();
        assert!(yaml.contains("image: gcr.io/acme/kgate-gateway"), "got:\n{yaml}");
        assert!(yaml.contains("imagePullPolicy: Always"), "got:\n{yaml}");
    }

    #[test]
    fn test_manifest_maps_container_port_to_same_host_port() {
        let yaml = rendered();
        assert!(yaml.contains("containerPort: 8080"), "got:\n{yaml}");
        assert!(yaml.contains("hostPort: 8080"), "got:\n{yaml}");
    }

    #[test]
    fn test_manifest_carries_execution_context_marker() {
        let yaml = rendered();
        assert!(yaml.contains("name: GATEWAY_ENV"), "got:\n{yaml}");
        assert!(yaml.contains("value: gce"), "got:\n{yaml}");
    }
}
