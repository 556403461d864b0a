//! Typed domain error enums.
//!
//! This module imports nothing from the infrastructure or command layers.
//! All error types implement `thiserror::Error` and convert to
//! `anyhow::Error` via the `?` operator. Each variant maps to a distinct
//! process exit code so scripts wrapping `kgate` can branch on the failure
//! kind; `main` performs the downcast.

use thiserror::Error;

/// Exit code used by clap for argument/usage errors.
pub const EXIT_USAGE: i32 = 2;

// ── Provision errors ──────────────────────────────────────────────────────────

/// Failure kinds of `kgate provision`. All are terminal — nothing is retried
/// and partially created resources (e.g. a network without its firewall rule)
/// are left for the operator to resolve.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Cancelled.")]
    Cancelled,

    #[error("Image build failed:\n{0}")]
    Build(String),

    #[error("Image push failed:\n{0}")]
    Push(String),

    #[error("Network creation failed:\n{0}")]
    Network(String),

    #[error("Firewall rule creation failed:\n{0}")]
    Firewall(String),

    #[error("Instance creation failed:\n{0}")]
    InstanceCreate(String),
}

impl ProvisionError {
    /// Process exit code for this failure kind.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 3,
            Self::Build(_) => 4,
            Self::Push(_) => 5,
            Self::Network(_) => 6,
            Self::Firewall(_) => 7,
            Self::InstanceCreate(_) => 8,
        }
    }
}

// ── Connect errors ────────────────────────────────────────────────────────────

/// Failure kinds of `kgate connect`.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("No account is configured. Run 'gcloud auth login' first.")]
    Authentication,

    #[error("Gateway deployment failed: {0}")]
    Deploy(#[source] ProvisionError),

    #[error("Gateway '{instance}' is not reachable over SSH:\n{detail}")]
    Unreachable { instance: String, detail: String },
}

impl ConnectError {
    /// Process exit code for this failure kind.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Authentication => 3,
            Self::Deploy(_) => 4,
            Self::Unreachable { .. } => 5,
        }
    }
}
