//! Deployment target — the immutable `{project, zone}` pair every cloud
//! operation is scoped to.
//!
//! The CLI layer resolves flags and ambient `CLOUDSDK_*` environment
//! defaults into this struct; the core never reads the environment itself.

/// Project and zone a command operates on. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    /// Cloud project identifier, e.g. `"my-project"`.
    pub project: String,
    /// Compute zone identifier, e.g. `"us-central1-a"`.
    pub zone: String,
}

impl DeploymentTarget {
    #[must_use]
    pub fn new(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
        }
    }

    /// Registry path the gateway image is pushed to for this project.
    #[must_use]
    pub fn image_ref(&self) -> String {
        format!("gcr.io/{}/{}", self.project, crate::gateway::IMAGE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_embeds_project() {
        let target = DeploymentTarget::new("acme-lab", "us-central1-a");
        assert_eq!(target.image_ref(), "gcr.io/acme-lab/kgate-gateway");
    }
}
