//! Client configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Target address, e.g. `ws://localhost:8080/ws`.
    pub url: String,

    /// Extra headers sent with CONNECT (login, passcode, ...).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// How long to wait for CONNECTED. `0` waits indefinitely.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_connect_timeout_ms() -> u64 {
    10_000 // 10 seconds
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024 // 16 MiB
}

impl ClientConfig {
    /// Create a configuration for `url` with defaults.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_message_size: default_max_message_size(),
        }
    }

    /// Add a CONNECT header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the CONNECTED wait timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the maximum inbound message size.
    #[must_use]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// The CONNECTED wait timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("ws://localhost:8080/ws")
            .with_header("login", "guest")
            .with_connect_timeout(Duration::from_secs(3))
            .with_max_message_size(1024);

        assert_eq!(config.url, "ws://localhost:8080/ws");
        assert_eq!(config.headers.get("login").map(String::as_str), Some("guest"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_message_size, 1024);
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "url": "ws://broker:61614/stomp" }"#).unwrap();
        assert!(config.headers.is_empty());
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.max_message_size, 16 * 1024 * 1024);
    }
}
