//! CLI configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (WSTOMP_*)
//! - TOML configuration file
//! - Command line arguments, which override both

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use wstomp_client::ClientConfig;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Broker address.
    #[serde(default = "default_url")]
    pub url: String,

    /// Destination to subscribe to.
    #[serde(default = "default_destination")]
    pub destination: String,

    /// Headers sent with CONNECT.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// How long to wait for CONNECTED, in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter.
    #[serde(default)]
    pub enabled: bool,

    /// Exporter port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_url() -> String {
    std::env::var("WSTOMP_URL").unwrap_or_else(|_| "ws://localhost:8080/ws".to_string())
}

fn default_destination() -> String {
    std::env::var("WSTOMP_DESTINATION").unwrap_or_else(|_| "/topic/test".to_string())
}

fn default_connect_timeout() -> u64 {
    std::env::var("WSTOMP_CONNECT_TIMEOUT_MS")
        .ok()
        .and_then(|t| t.parse().ok())
        .unwrap_or(10_000) // 10 seconds
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024 // 16 MiB
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            destination: default_destination(),
            headers: BTreeMap::new(),
            connect_timeout_ms: default_connect_timeout(),
            max_message_size: default_max_message_size(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "wstomp.toml",
            "/etc/wstomp/wstomp.toml",
            "~/.config/wstomp/wstomp.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// The CONNECTED wait timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Client settings derived from this configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new(self.url.as_str())
            .with_connect_timeout(self.connect_timeout())
            .with_max_message_size(self.max_message_size);
        for (name, value) in &self.headers {
            client = client.with_header(name.as_str(), value.as_str());
        }
        client
    }
}
