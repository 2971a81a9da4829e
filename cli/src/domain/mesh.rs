//! Reading `tailscale` output.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Log file the detached `tailscale up` writes its login URL to.
pub const AUTH_LOG: &str = "/tmp/bunkr-ts-auth.log";

/// Printed by `tailscale serve` when the tailnet has Serve turned off.
pub const SERVE_DISABLED: &str = "Serve is not enabled";

#[allow(clippy::expect_used)] // compile-time constant pattern
static LOGIN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://login\.tailscale\.com/\S+").expect("valid login URL pattern")
});

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(rename = "BackendState", default)]
    backend_state: String,
    #[serde(rename = "Self", default)]
    self_node: Option<RawNode>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNode {
    #[serde(rename = "DNSName", default)]
    dns_name: String,
}

/// What `tailscale status --json` says about this node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshStatus {
    pub connected: bool,
    /// `MagicDNS` name without the trailing dot; empty if unknown.
    pub hostname: String,
}

/// Parse `tailscale status --json`.
///
/// Empty or unparsable output means "not connected".
#[must_use]
pub fn parse_status(output: &str) -> MeshStatus {
    let Ok(raw) = serde_json::from_str::<RawStatus>(output.trim()) else {
        return MeshStatus::default();
    };
    MeshStatus {
        connected: raw.backend_state == "Running",
        hostname: raw
            .self_node
            .map(|n| n.dns_name.trim_end_matches('.').to_string())
            .unwrap_or_default(),
    }
}

/// First Tailscale login or admin URL in `text`.
#[must_use]
pub fn find_login_url(text: &str) -> Option<String> {
    LOGIN_URL.find(text).map(|m| m.as_str().to_string())
}
