use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use josser_protocol::{Protocol, TransportError};
use serde::Deserialize;

use crate::transport::{HttpTransport, Transport};

/// Top-level client configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where requests are sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    Unix {
        #[serde(default = "default_socket_path")]
        socket_path: String,
    },
    Http {
        url: String,
    },
}

fn default_socket_path() -> String {
    "/tmp/josser.sock".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            timeout_ms: default_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Unix {
            socket_path: default_socket_path(),
        }
    }
}

impl Config {
    /// Load config from the default path (~/.config/josser/config.toml).
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(format!("{home}/.config/josser/config.toml"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.client.timeout_ms)
    }

    /// Instantiate the configured transport.
    pub fn build_transport(&self) -> Result<Box<dyn Transport>, TransportError> {
        match &self.transport {
            TransportConfig::Http { url } => {
                Ok(Box::new(HttpTransport::new(url.clone(), self.timeout())))
            }
            #[cfg(unix)]
            TransportConfig::Unix { socket_path } => Ok(Box::new(
                crate::transport::UnixTransport::new(socket_path).with_timeout(self.timeout()),
            )),
            #[cfg(not(unix))]
            TransportConfig::Unix { .. } => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Unix socket transport is not supported on this platform",
            ))),
        }
    }
}

/// Initialize tracing subscriber. `RUST_LOG` takes precedence over
/// `log_level`. Logs go to stderr so stdout stays clean for results.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.client.protocol, Protocol::V2);
        assert_eq!(config.client.timeout_ms, 5000);
        assert_eq!(
            config.transport,
            TransportConfig::Unix {
                socket_path: "/tmp/josser.sock".to_string()
            }
        );
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[client]
protocol = "1.0"
timeout_ms = 250
log_level = "debug"

[transport]
kind = "http"
url = "http://127.0.0.1:8332/"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.client.protocol, Protocol::V1);
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.client.log_level, "debug");
        assert_eq!(
            config.transport,
            TransportConfig::Http {
                url: "http://127.0.0.1:8332/".to_string()
            }
        );
        assert_eq!(config.build_transport().unwrap().name(), "http");
    }

    #[test]
    fn unix_transport_defaults_socket_path() {
        let config: Config = toml::from_str("[transport]\nkind = \"unix\"\n").unwrap();
        assert_eq!(config.transport, TransportConfig::default());
        assert_eq!(config.client.log_level, "info");
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        assert!(toml::from_str::<Config>("[client]\nprotocol = \"3.0\"\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load_from(Path::new("/tmp/josser-missing-config.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
