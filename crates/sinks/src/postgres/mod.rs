//! PostgreSQL COPY sink
//!
//! Streams tab-separated text rows into PostgreSQL using the COPY FROM STDIN
//! protocol. Each destination table gets its own connection and its own
//! `TableSession`; the `SessionRegistry` creates sessions lazily on the first
//! record seen for a table and sweeps them for time-based flushes.

mod config;
mod encode;
mod error;
mod registry;
pub mod sanitize;
mod session;
mod target;

pub use config::{PostgresConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FLUSH_INTERVAL};
pub use encode::{copy_statement, encode_record, NULL_TOKEN};
pub use error::CopyError;
pub use registry::SessionRegistry;
pub use session::{FlushPolicy, SessionState, TableSession};
pub use target::{CopyTarget, CopyTargetFactory, PgCopyTarget, PgTargetFactory};

#[cfg(test)]
#[path = "encode_test.rs"]
mod encode_test;
