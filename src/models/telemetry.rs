use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Matches the game version inside a host version string such as `1.20.1-R0.1 (MC: 1.20.1)`.
static GAME_VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MC: (\d+\.\d+\.\d+)").expect("Invalid game version regex"));

/// Facts about the host reported when the integration is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformTelemetry {
    pub plugin_version: String,
    pub server_software: String,
    pub server_version: String,
    pub runtime: String,
    pub arch: String,
    pub online_mode: bool,
}

/// What the host knows about itself, as reported through [`crate::host::HostBridge`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub software: String,
    pub version: String,
    pub online_mode: bool,
}

impl PlatformTelemetry {
    pub fn from_server(info: &ServerInfo) -> Self {
        Self {
            plugin_version: crate::VERSION.to_string(),
            server_software: info.software.clone(),
            server_version: normalize_server_version(&info.version),
            runtime: format!("rust/{}", std::env::consts::FAMILY),
            arch: std::env::consts::ARCH.to_string(),
            online_mode: info.online_mode,
        }
    }
}

/// Reduce a verbose host version string to the bare game version when one is embedded.
pub fn normalize_server_version(raw: &str) -> String {
    GAME_VERSION_PATTERN
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| raw.to_string())
}
