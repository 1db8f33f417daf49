use std::time::Duration;

use serde::Deserialize;

/// Default flush interval for timed sweeps.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Default bound on a single connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

/// PostgreSQL sink settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    /// Database server host
    #[serde(default = "default_host")]
    pub host: String,
    /// Database server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name; validated non-empty before use
    #[serde(default)]
    pub dbname: String,
    /// Role to connect as; omitted from the connection string when empty
    #[serde(default)]
    pub user: String,
    /// Password; omitted from the connection string when empty
    #[serde(default)]
    pub password: String,
    /// Seconds allowed for one connection attempt
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dbname: String::new(),
            user: String::new(),
            password: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl PostgresConfig {
    pub fn new(dbname: impl Into<String>) -> Self {
        Self {
            dbname: dbname.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Key/value connection string in libpq format.
    pub fn params(&self) -> String {
        let mut params = format!(
            "host={} port={} dbname={}",
            self.host, self.port, self.dbname
        );
        if !self.user.is_empty() {
            params.push_str(&format!(" user={}", self.user));
        }
        if !self.password.is_empty() {
            params.push_str(&format!(" password={}", self.password));
        }
        params
    }

    /// The same string with the password masked, for logs.
    pub fn display_params(&self) -> String {
        let mut params = format!(
            "host={} port={} dbname={}",
            self.host, self.port, self.dbname
        );
        if !self.user.is_empty() {
            params.push_str(&format!(" user={}", self.user));
        }
        if !self.password.is_empty() {
            params.push_str(" password=<redacted>");
        }
        params
    }
}
