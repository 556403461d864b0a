//! Bridge address detection for the tunnel's local endpoint.
//!
//! The dependent client usually runs in a container, so binding the tunnel
//! to the container-networking bridge (`docker0`) makes the endpoint
//! reachable from inside it. Detection shells out to `ip -json addr show`
//! through the [`CommandRunner`]; the JSON parse is a pure function so it
//! can be tested against captured output. Loopback is the fallback when the
//! interface is absent (no Docker on the host).

use anyhow::Result;

use crate::command_runner::CommandRunner;

/// Interface the tunnel binds when no `--bridge` flag is given.
pub const BRIDGE_INTERFACE: &str = "docker0";

/// Fallback local endpoint when the bridge interface cannot be resolved.
pub const FALLBACK_ADDRESS: &str = "127.0.0.1";

/// Returns the IPv4 address of [`BRIDGE_INTERFACE`], or [`FALLBACK_ADDRESS`]
/// when the interface is missing or carries no address.
pub async fn detect(runner: &impl CommandRunner) -> String {
    let output = match runner
        .run("ip", &["-json", "addr", "show", BRIDGE_INTERFACE])
        .await
    {
        Ok(o) if o.status.success() => o,
        _ => return FALLBACK_ADDRESS.to_string(),
    };
    parse_ipv4(&output.stdout).unwrap_or_else(|_| FALLBACK_ADDRESS.to_string())
}

/// Extracts the first IPv4 address from `ip -json addr show` output.
///
/// # Errors
///
/// Returns an error if the output is not valid JSON or holds no IPv4
/// address entry.
pub fn parse_ipv4(stdout: &[u8]) -> Result<String> {
    let parsed: serde_json::Value = serde_json::from_slice(stdout)?;
    parsed
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|iface| {
            iface
                .get("addr_info")
                .and_then(|a| a.as_array())
                .into_iter()
                .flatten()
        })
        .find(|addr| addr.get("family").and_then(|f| f.as_str()) == Some("inet"))
        .and_then(|addr| addr.get("local").and_then(|l| l.as_str()))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("no IPv4 address on {BRIDGE_INTERFACE}"))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    const DOCKER0_JSON: &[u8] = br#"[{"ifname":"docker0","addr_info":[
        {"family":"inet","local":"172.17.0.1","prefixlen":16},
        {"family":"inet6","local":"fe80::1","prefixlen":64}]}]"#;

    #[test]
    fn test_parse_ipv4_picks_inet_entry() {
        assert_eq!(parse_ipv4(DOCKER0_JSON).expect("parse"), "172.17.0.1");
    }

    #[test]
    fn test_parse_ipv4_skips_ipv6_only_interface() {
        let json = br#"[{"ifname":"docker0","addr_info":[
            {"family":"inet6","local":"fe80::1","prefixlen":64}]}]"#;
        assert!(parse_ipv4(json).is_err());
    }

    #[test]
    fn test_parse_ipv4_rejects_non_json() {
        assert!(parse_ipv4(b"docker0: no such device").is_err());
    }

    #[test]
    fn test_parse_ipv4_rejects_empty_listing() {
        assert!(parse_ipv4(b"[]").is_err());
    }
}
