use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

// =============================================================================
// File config (figment-deserialized from defaults / relay.toml / env vars)
// =============================================================================
//
//   relay.toml:      [server]
//                    port = 9000
//
//   env var:         RELAY_SERVER__PORT=9000   (double underscore = nesting)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub hub: HubFileConfig,
    #[serde(default)]
    pub page: PageFileConfig,
}

/// Listener settings (lives under `[server]` in relay.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Broadcast hub tunables (lives under `[hub]` in relay.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HubFileConfig {
    /// Capacity of the event queue feeding the hub. Readers wait when it is full.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for HubFileConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

/// Chat page settings (lives under `[page]` in relay.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageFileConfig {
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for PageFileConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_event_capacity() -> usize {
    256
}
fn default_title() -> String {
    "Chat relay".to_string()
}

/// Build a figment that layers: defaults → relay.toml → RELAY_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `RELAY_SERVER__PORT=9000`  →  `server.port = 9000`
///   `RELAY_HUB__EVENT_CAPACITY=64`  →  `hub.event_capacity = 64`
pub fn load_config(path: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("RELAY_").split("__"))
}

/// Values given on the command line; they win over every file/env layer.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

// =============================================================================
// Runtime config structs (derived from FileConfig)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_file(fc: &ServerFileConfig, overrides: &CliOverrides) -> Self {
        Self {
            host: overrides.host.clone().unwrap_or_else(|| fc.host.clone()),
            port: overrides.port.unwrap_or(fc.port),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Clone, Debug)]
pub struct HubConfig {
    pub event_capacity: usize,
}

impl HubConfig {
    pub fn from_file(fc: &HubFileConfig) -> Self {
        Self {
            // tokio's bounded channel rejects a zero capacity
            event_capacity: fc.event_capacity.max(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PageConfig {
    pub title: String,
}

impl PageConfig {
    pub fn from_file(fc: &PageFileConfig) -> Self {
        Self {
            title: fc.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ────────────────────────────────────────────────────────

    #[test]
    fn test_file_config_defaults() {
        let fc = FileConfig::default();
        assert_eq!(fc.server.host, "0.0.0.0");
        assert_eq!(fc.server.port, 8080);
        assert_eq!(fc.hub.event_capacity, 256);
        assert_eq!(fc.page.title, "Chat relay");
    }

    // ── runtime views ───────────────────────────────────────────────────

    #[test]
    fn test_server_config_without_overrides() {
        let sc = ServerConfig::from_file(&ServerFileConfig::default(), &CliOverrides::default());
        assert_eq!(sc.host, "0.0.0.0");
        assert_eq!(sc.port, 8080);
        assert_eq!(sc.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_cli_overrides_win() {
        let overrides = CliOverrides {
            host: Some("127.0.0.1".into()),
            port: Some(0),
        };
        let sc = ServerConfig::from_file(&ServerFileConfig::default(), &overrides);
        assert_eq!(sc.socket_addr().unwrap(), "127.0.0.1:0".parse().unwrap());
    }

    #[test]
    fn test_invalid_host_is_an_error() {
        let fc = ServerFileConfig {
            host: "not a host".into(),
            port: 1,
        };
        let sc = ServerConfig::from_file(&fc, &CliOverrides::default());
        assert!(sc.socket_addr().is_err());
    }

    #[test]
    fn test_hub_capacity_never_zero() {
        let hc = HubConfig::from_file(&HubFileConfig { event_capacity: 0 });
        assert_eq!(hc.event_capacity, 1);
    }

    // ── load_config ─────────────────────────────────────────────────────

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let fc: FileConfig = load_config(&tmp.path().join("relay.toml"))
            .extract()
            .unwrap();
        assert_eq!(fc.server.port, 8080);
        assert_eq!(fc.hub.event_capacity, 256);
    }

    #[test]
    fn test_load_config_toml_sets_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("relay.toml");
        std::fs::write(
            &path,
            "[server]\nhost = \"127.0.0.1\"\nport = 9000\n\n[hub]\nevent_capacity = 8\n\n[page]\ntitle = \"Lobby\"\n",
        )
        .unwrap();
        let fc: FileConfig = load_config(&path).extract().unwrap();
        assert_eq!(fc.server.host, "127.0.0.1");
        assert_eq!(fc.server.port, 9000);
        assert_eq!(fc.hub.event_capacity, 8);
        assert_eq!(fc.page.title, "Lobby");
    }

    #[test]
    fn test_load_config_partial_section_keeps_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("relay.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        let fc: FileConfig = load_config(&path).extract().unwrap();
        assert_eq!(fc.server.host, "0.0.0.0");
        assert_eq!(fc.server.port, 9100);
        assert_eq!(fc.page.title, "Chat relay");
    }
}
