//! Flush scheduling configuration

use std::time::Duration;

use serde::Deserialize;

use dblog_sinks::postgres::DEFAULT_FLUSH_INTERVAL;

fn default_flush_secs() -> u64 {
    DEFAULT_FLUSH_INTERVAL.as_secs()
}

fn default_tick_secs() -> u64 {
    1
}

/// Pipeline settings
///
/// # Example
///
/// ```toml
/// [pipeline]
/// flush_interval_secs = 30
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seconds a table's rows may sit buffered before a timed flush
    pub flush_interval_secs: u64,

    /// Seconds between flush sweeps; clamped to the flush interval
    pub tick_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_secs(),
            tick_secs: default_tick_secs(),
        }
    }
}

impl PipelineConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Sweep granularity, never larger than the flush interval.
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs.min(self.flush_interval_secs).max(1))
    }
}
