//! Gateway services — provisioning, session resolution, and tunnel lifecycle.

pub mod provision;
pub mod resolve;
pub mod tunnel;

/// Port the gateway container listens on; also the VM host port.
pub const GATEWAY_PORT: u16 = 8080;

/// Local port the tunnel binds on the bridge address.
pub const LOCAL_TUNNEL_PORT: u16 = 8082;

/// Image name under the project registry (`gcr.io/<project>/kgate-gateway`).
pub const IMAGE_NAME: &str = "kgate-gateway";

/// Reserved network every gateway VM joins.
pub const NETWORK_NAME: &str = "kgate-network";

/// Firewall rule permitting inbound SSH on [`NETWORK_NAME`].
pub const FIREWALL_RULE: &str = "kgate-network-allow-ssh";

/// Default instance name for a bare `kgate provision`.
pub const DEFAULT_INSTANCE: &str = "kgate-gateway";

/// Environment variable set inside the gateway container.
pub const GATEWAY_ENV_NAME: &str = "GATEWAY_ENV";
/// Its value — tells the service it runs on a cloud VM.
pub const GATEWAY_ENV_VALUE: &str = "gce";

/// Environment variable handed to the dependent client process, pointing at
/// the local tunnel endpoint.
pub const CLIENT_URL_ENV: &str = "KERNEL_GATEWAY_URL";
