//! Tunnel session lifecycle.
//!
//! The forwarding process moves through `Absent → Establishing → Active →
//! Terminating → Absent`. [`TunnelSession`] owns the `Active` state as a
//! scoped guard: `terminate()` is the authoritative teardown on the normal
//! path, and `Drop` (backed by `kill_on_drop` on the child itself) covers
//! error returns, panics, and the signal branch. A leaked forwarding
//! process keeps an SSH session — and the operator's attention — alive, so
//! every exit path must release it.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::domain::error::ConnectError;
use crate::domain::target::DeploymentTarget;
use crate::gateway::{GATEWAY_PORT, LOCAL_TUNNEL_PORT};
use crate::gcloud::Gcloud;

/// Grace period after spawn before the forward is considered established.
/// An immediately-exiting child (bad flags, unreachable host) is caught here
/// instead of surfacing as a confusing connection refusal later.
const ESTABLISH_GRACE: Duration = Duration::from_millis(750);

/// Runs a no-op remote command on the instance.
///
/// First contact propagates the caller's SSH key to the VM; a failure here
/// means the tunnel would never come up, so the whole operation stops.
///
/// # Errors
///
/// Returns [`ConnectError::Unreachable`] when the remote command fails.
pub async fn verify_reachable(
    gcloud: &impl Gcloud,
    target: &DeploymentTarget,
    instance: &str,
) -> Result<()> {
    let output = gcloud
        .ssh_noop(target, instance)
        .await
        .context("probing gateway over ssh")?;
    if !output.status.success() {
        return Err(ConnectError::Unreachable {
            instance: instance.to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(())
}

/// A live background forwarding session from `<bridge>:8082` to the
/// gateway's `localhost:8080`.
#[derive(Debug)]
pub struct TunnelSession {
    child: tokio::process::Child,
    endpoint: String,
}

impl TunnelSession {
    /// Spawns the forwarding process and waits out the establish grace
    /// period.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Unreachable`] when the forwarding process
    /// exits during establishment, or an error if it cannot be spawned.
    pub async fn establish(
        gcloud: &impl Gcloud,
        target: &DeploymentTarget,
        instance: &str,
        bridge: &str,
    ) -> Result<Self> {
        let mut child = gcloud
            .spawn_tunnel(target, instance, bridge, LOCAL_TUNNEL_PORT, GATEWAY_PORT)
            .context("spawning tunnel")?;

        tokio::time::sleep(ESTABLISH_GRACE).await;
        if child.try_wait().context("polling tunnel process")?.is_some() {
            let detail = drain_stderr(&mut child).await;
            return Err(ConnectError::Unreachable {
                instance: instance.to_string(),
                detail,
            }
            .into());
        }

        // The stderr pipe stays open for the life of the session. Left
        // unread it fills the OS pipe buffer and blocks the forwarder, so
        // hand it to a background drain once establishment is past.
        if let Some(mut stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
            });
        }

        Ok(Self {
            child,
            endpoint: format!("http://{bridge}:{LOCAL_TUNNEL_PORT}"),
        })
    }

    /// Wraps an already-spawned forwarding process. Used by tests.
    #[must_use]
    pub fn from_child(child: tokio::process::Child, endpoint: String) -> Self {
        Self { child, endpoint }
    }

    /// Local URL the dependent client should talk to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// OS process id of the forwarding process, if it is still running.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Terminates the forwarding session and waits for the process to be
    /// reaped.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be delivered.
    pub async fn terminate(mut self) -> Result<()> {
        self.child.kill().await.context("terminating tunnel")?;
        Ok(())
    }
}

impl Drop for TunnelSession {
    fn drop(&mut self) {
        // Already-exited children return an error here; nothing to release.
        let _ = self.child.start_kill();
    }
}

async fn drain_stderr(child: &mut tokio::process::Child) -> String {
    use tokio::io::AsyncReadExt;
    let mut buf = Vec::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output, Stdio};

    use super::*;

    fn target() -> DeploymentTarget {
        DeploymentTarget::new("acme", "us-central1-a")
    }

    /// Mock gcloud for the tunnel paths only; listing and provisioning
    /// fail the test when touched.
    struct GcloudTunnel {
        ssh_fails: bool,
        tunnel_cmd: &'static str,
    }

    impl Gcloud for GcloudTunnel {
        async fn account(&self) -> Result<Output> {
            unimplemented!()
        }
        async fn list_instances(&self, _: &DeploymentTarget, _: &str) -> Result<Output> {
            unimplemented!()
        }
        async fn describe_network(&self, _: &DeploymentTarget) -> Result<Output> {
            unimplemented!()
        }
        async fn create_network(&self, _: &DeploymentTarget) -> Result<Output> {
            unimplemented!()
        }
        async fn create_firewall_rule(&self, _: &DeploymentTarget) -> Result<Output> {
            unimplemented!()
        }
        async fn create_instance(&self, _: &DeploymentTarget, _: &str, _: &str) -> Result<Output> {
            unimplemented!()
        }
        async fn ssh_noop(&self, _: &DeploymentTarget, _: &str) -> Result<Output> {
            Ok(if self.ssh_fails {
                Output {
                    status: ExitStatus::from_raw(255 << 8),
                    stdout: Vec::new(),
                    stderr: b"ssh: connect to host: Connection timed out".to_vec(),
                }
            } else {
                Output {
                    status: ExitStatus::from_raw(0),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                }
            })
        }
        fn spawn_tunnel(
            &self,
            _: &DeploymentTarget,
            _: &str,
            _: &str,
            _: u16,
            _: u16,
        ) -> Result<tokio::process::Child> {
            Ok(tokio::process::Command::new("sh")
                .args(["-c", self.tunnel_cmd])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()?)
        }
    }

    #[tokio::test]
    async fn failing_remote_probe_reports_unreachable() {
        let gcloud = GcloudTunnel {
            ssh_fails: true,
            tunnel_cmd: "",
        };
        let err = verify_reachable(&gcloud, &target(), "kgate-abc-00001")
            .await
            .expect_err("probe must fail");
        match err.downcast_ref::<ConnectError>() {
            Some(ConnectError::Unreachable { instance, detail }) => {
                assert_eq!(instance, "kgate-abc-00001");
                assert!(detail.contains("Connection timed out"), "got: {detail}");
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_remote_probe_passes() {
        let gcloud = GcloudTunnel {
            ssh_fails: false,
            tunnel_cmd: "",
        };
        verify_reachable(&gcloud, &target(), "kgate-abc-00001")
            .await
            .expect("probe");
    }

    #[tokio::test]
    async fn establish_surfaces_early_exit_as_unreachable_with_stderr() {
        let gcloud = GcloudTunnel {
            ssh_fails: false,
            tunnel_cmd: "echo 'bind: Address already in use' >&2; exit 255",
        };
        let err = TunnelSession::establish(&gcloud, &target(), "kgate-abc-00001", "127.0.0.1")
            .await
            .expect_err("forwarder exited during establishment");
        match err.downcast_ref::<ConnectError>() {
            Some(ConnectError::Unreachable { detail, .. }) => {
                assert!(detail.contains("Address already in use"), "got: {detail}");
            }
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn establish_hands_stderr_to_background_drain() {
        let gcloud = GcloudTunnel {
            ssh_fails: false,
            tunnel_cmd: "sleep 30",
        };
        let session = TunnelSession::establish(&gcloud, &target(), "kgate-abc-00001", "127.0.0.1")
            .await
            .expect("establish");
        // The pipe must not sit unread on the session while Active.
        assert!(session.child.stderr.is_none());
        assert_eq!(
            session.endpoint(),
            format!("http://127.0.0.1:{LOCAL_TUNNEL_PORT}")
        );
        session.terminate().await.expect("terminate");
    }

    fn spawn_sleeper() -> tokio::process::Child {
        tokio::process::Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .expect("spawn sleep")
    }

    async fn assert_gone(pid: u32) {
        // kill -0 probes process existence without signaling it. The kernel
        // needs a moment to reap, so poll within a bounded grace period.
        for _ in 0..20 {
            let alive = std::process::Command::new("kill")
                .args(["-0", &pid.to_string()])
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if !alive {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("process {pid} still running after teardown");
    }

    #[tokio::test]
    async fn terminate_kills_forwarding_process() {
        let child = spawn_sleeper();
        let session = TunnelSession::from_child(child, "http://127.0.0.1:8082".into());
        let pid = session.pid().expect("running child has a pid");
        session.terminate().await.expect("terminate");
        assert_gone(pid).await;
    }

    #[tokio::test]
    async fn drop_kills_forwarding_process() {
        let child = spawn_sleeper();
        let session = TunnelSession::from_child(child, "http://127.0.0.1:8082".into());
        let pid = session.pid().expect("running child has a pid");
        drop(session);
        assert_gone(pid).await;
    }

    #[tokio::test]
    async fn endpoint_reports_bridge_and_local_port() {
        let child = spawn_sleeper();
        let session = TunnelSession::from_child(child, "http://172.17.0.1:8082".into());
        assert_eq!(session.endpoint(), "http://172.17.0.1:8082");
        session.terminate().await.expect("terminate");
    }
}
