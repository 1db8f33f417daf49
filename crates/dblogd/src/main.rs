//! dblogd - stream events into PostgreSQL
//!
//! # Usage
//!
//! ```bash
//! # Everything from a config file
//! dblogd --config configs/dblogd.toml
//!
//! # Or straight from flags
//! dblogd -d logs --source 10.0.0.2:47757 --db-host db.internal
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dblog_config::{Config, EventSourceSection, LogFormat};
use dblog_pipeline::Pipeline;
use dblog_sinks::postgres::PgTargetFactory;

/// dblogd - stream events into PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "dblogd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Event emitter to read from, as HOST:PORT. Repeatable; adds to the
    /// sources from the config file.
    #[arg(short, long = "source", value_name = "HOST:PORT")]
    sources: Vec<String>,

    /// Database host. Overrides config file.
    #[arg(long)]
    db_host: Option<String>,

    /// Database port. Overrides config file.
    #[arg(long)]
    db_port: Option<u16>,

    /// Database name. Overrides config file.
    #[arg(short, long)]
    dbname: Option<String>,

    /// Database user. Overrides config file.
    #[arg(long)]
    db_user: Option<String>,

    /// Database password. Overrides config file.
    #[arg(long)]
    db_password: Option<String>,

    /// Seconds between timed flushes. Overrides config file.
    #[arg(short, long)]
    flush_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_logging(cli.log_level.as_deref().unwrap_or(config.log.level.as_str()), config.log.format)?;

    info!(
        database = %config.postgres.display_params(),
        sources = config.sources.event.len(),
        flush_secs = config.pipeline.flush_interval_secs,
        "dblogd starting"
    );

    let cancel = CancellationToken::new();
    let mut handles = Vec::new();
    for section in &config.sources.event {
        let factory = PgTargetFactory::new(config.postgres.clone());
        let pipeline = Pipeline::new(
            section.to_source_config(),
            factory,
            config.pipeline.flush_interval(),
            config.pipeline.tick(),
        );
        handles.push(tokio::spawn(pipeline.run(cancel.clone())));
    }

    wait_for_shutdown().await;
    info!("shutdown signal received, draining...");
    cancel.cancel();
    for handle in handles {
        let _ = handle.await;
    }
    info!("dblogd stopped");

    Ok(())
}

/// Load the config file (if any) and fold the CLI overrides into it.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(host) = &cli.db_host {
        config.postgres.host = host.clone();
    }
    if let Some(port) = cli.db_port {
        config.postgres.port = port;
    }
    if let Some(dbname) = &cli.dbname {
        config.postgres.dbname = dbname.clone();
    }
    if let Some(user) = &cli.db_user {
        config.postgres.user = user.clone();
    }
    if let Some(password) = &cli.db_password {
        config.postgres.password = password.clone();
    }
    if let Some(secs) = cli.flush_interval {
        config.pipeline.flush_interval_secs = secs;
    }
    for spec in &cli.sources {
        config.sources.event.push(parse_source(spec)?);
    }

    // Flags can complete a config the file alone would reject, so validate
    // only after merging.
    config.validate()?;
    Ok(config)
}

/// Parse a HOST:PORT emitter spec.
fn parse_source(spec: &str) -> Result<EventSourceSection> {
    let (host, port) = spec
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("source '{}' is not HOST:PORT", spec))?;
    let port: u16 = port
        .parse()
        .map_err(|_| anyhow!("source '{}' has an invalid port", spec))?;
    Ok(EventSourceSection::new(host, port))
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        let section = parse_source("10.0.0.2:47757").unwrap();
        assert_eq!(section.host, "10.0.0.2");
        assert_eq!(section.port, 47757);
    }

    #[test]
    fn test_parse_source_rejects_garbage() {
        assert!(parse_source("no-port-here").is_err());
        assert!(parse_source("host:not-a-number").is_err());
    }
}
