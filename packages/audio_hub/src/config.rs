use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::hub::DEFAULT_COMMAND_CAPACITY;
use crate::session::DEFAULT_OUTBOUND_CAPACITY;

// =============================================================================
// Unified config (figment-deserialized from defaults / audio_hub.toml / env)
// =============================================================================
//
//   audio_hub.toml:  [hub]
//                    outbound_capacity = 128
//
//   env var:         AUDIO_HUB_HUB__OUTBOUND_CAPACITY=128   (double underscore = nesting)
//
// The bare PORT variable is honored too, below the AUDIO_HUB_* variables.

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hub: HubSettings,
}

/// Listener settings (lives under `[server]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

/// Queue bounds (lives under `[hub]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HubSettings {
    /// Pending register/unregister/submit commands before callers wait
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
    /// Messages buffered per connection; a recipient whose buffer is full
    /// is dropped from the room
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            command_capacity: default_command_capacity(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_command_capacity() -> usize {
    DEFAULT_COMMAND_CAPACITY
}

fn default_outbound_capacity() -> usize {
    DEFAULT_OUTBOUND_CAPACITY
}

/// Build a figment that layers: defaults → config file → PORT → AUDIO_HUB_* env vars.
///
///   `AUDIO_HUB_SERVER__PORT=9000`  →  `server.port = 9000`
pub fn load_config(path: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(HubConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
        .merge(Env::prefixed("AUDIO_HUB_").split("__"))
}

impl HubConfig {
    /// Load from `path` and the environment, then apply CLI overrides.
    pub fn load(path: &Path, host: Option<String>, port: Option<u16>) -> Result<Self> {
        let mut config: HubConfig = load_config(path)
            .extract()
            .context("Failed to load configuration")?;

        if let Some(host) = host {
            config.server.host = host;
        }
        if let Some(port) = port {
            config.server.port = port;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.hub.command_capacity, DEFAULT_COMMAND_CAPACITY);
        assert_eq!(config.hub.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config: HubConfig = Figment::from(Serialized::defaults(HubConfig::default()))
            .merge(Toml::string(
                r#"
                [server]
                port = 9001

                [hub]
                outbound_capacity = 8
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.hub.outbound_capacity, 8);
        assert_eq!(config.hub.command_capacity, DEFAULT_COMMAND_CAPACITY);
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config: HubConfig = Figment::new()
            .merge(Toml::string("[hub]\ncommand_capacity = 4\n"))
            .extract()
            .unwrap();

        assert_eq!(config.hub.command_capacity, 4);
        assert_eq!(config.hub.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: 4000,
        };
        assert_eq!(server.socket_addr().unwrap().port(), 4000);

        let bad = ServerConfig {
            host: "not a host".into(),
            port: 4000,
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_cli_overrides_missing_file() {
        let config = HubConfig::load(
            Path::new("/nonexistent/audio_hub.toml"),
            Some("127.0.0.1".into()),
            Some(5555),
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5555);
    }
}
