//! dblog configuration
//!
//! TOML-based configuration loading with sensible defaults. A minimal
//! config names the database and one event emitter; everything else has a
//! working default.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use dblog_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "[postgres]\ndbname = \"logs\"\n\n[[sources.event]]\nport = 47757",
//! )
//! .unwrap();
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [postgres]
//! dbname = "logs"
//!
//! [[sources.event]]
//! host = "10.0.0.2"
//! port = 47757
//! ```
//!
//! See `configs/example.toml` for all available options.

mod error;
mod logging;
mod pipeline;
mod sources;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use pipeline::PipelineConfig;
pub use sources::{EventSourceSection, SourcesConfig};

pub use dblog_sinks::postgres::PostgresConfig;

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Destination database
    pub postgres: PostgresConfig,

    /// Flush scheduling
    pub pipeline: PipelineConfig,

    /// Event emitters to read from
    pub sources: SourcesConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks that a database is named, at least one source is configured,
    /// and the flush interval is non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.postgres.dbname.is_empty() {
            return Err(ConfigError::missing_field("postgres", "dbname"));
        }
        if self.sources.event.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.pipeline.flush_interval_secs == 0 {
            return Err(ConfigError::invalid_value(
                "pipeline",
                "flush_interval_secs",
                "must be non-zero",
            ));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_minimal_config() {
        let toml = r#"
[postgres]
dbname = "logs"

[[sources.event]]
port = 47757
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.postgres.dbname, "logs");
        assert_eq!(config.postgres.host, "127.0.0.1");
        assert_eq!(config.postgres.port, 5432);
        assert_eq!(config.sources.event.len(), 1);
        assert_eq!(config.pipeline.flush_interval_secs, 30);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[postgres]
host = "db.internal"
port = 5433
dbname = "logs"
user = "loader"
password = "secret"
connect_timeout_secs = 3

[pipeline]
flush_interval_secs = 10
tick_secs = 2

[[sources.event]]
host = "10.0.0.2"
port = 47757

[[sources.event]]
host = "10.0.0.3"
port = 47757
reconnect_secs = 1
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.postgres.host, "db.internal");
        assert_eq!(config.postgres.port, 5433);
        assert_eq!(config.pipeline.flush_interval_secs, 10);
        assert_eq!(config.sources.event.len(), 2);
        assert_eq!(config.sources.event[1].reconnect_secs, 1);
    }

    #[test]
    fn test_missing_dbname_rejected() {
        let toml = r#"
[[sources.event]]
port = 47757
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn test_no_sources_rejected() {
        let toml = r#"
[postgres]
dbname = "logs"
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::NoSources));
    }

    #[test]
    fn test_zero_flush_interval_rejected() {
        let toml = r#"
[postgres]
dbname = "logs"

[pipeline]
flush_interval_secs = 0

[[sources.event]]
port = 47757
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(result.is_err());
    }
}
