//! Event source configuration

use std::time::Duration;

use serde::Deserialize;

use dblog_sources::EventSourceConfig;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_reconnect_secs() -> u64 {
    5
}

/// One event emitter to read from
///
/// # Example
///
/// ```toml
/// [[sources.event]]
/// host = "10.0.0.2"
/// port = 47757
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventSourceSection {
    /// Emitter host to dial
    #[serde(default = "default_host")]
    pub host: String,

    /// Emitter port
    pub port: u16,

    /// Seconds between reconnect attempts
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

impl EventSourceSection {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            reconnect_secs: default_reconnect_secs(),
        }
    }

    /// Lower into the source crate's config
    pub fn to_source_config(&self) -> EventSourceConfig {
        let mut config = EventSourceConfig::new(&self.host, self.port);
        config.reconnect_delay = Duration::from_secs(self.reconnect_secs);
        config
    }
}

/// Data sources section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Event emitters to read from
    pub event: Vec<EventSourceSection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_in() {
        let section: EventSourceSection = toml::from_str("port = 47757").unwrap();
        assert_eq!(section.host, "127.0.0.1");
        assert_eq!(section.port, 47757);
        assert_eq!(section.reconnect_secs, 5);
    }

    #[test]
    fn test_to_source_config() {
        let section: EventSourceSection =
            toml::from_str("host = \"emitter\"\nport = 8000\nreconnect_secs = 2").unwrap();
        let config = section.to_source_config();
        assert_eq!(config.peer(), "emitter:8000");
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_port_is_required() {
        let result: Result<EventSourceSection, _> = toml::from_str("host = \"emitter\"");
        assert!(result.is_err());
    }
}
