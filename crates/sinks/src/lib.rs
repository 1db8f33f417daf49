//! dblog sinks - destination writers
//!
//! The one sink that matters here is PostgreSQL, fed through the streaming
//! COPY protocol: one connection and one load session per destination table,
//! rows batched in memory and committed on a row/time policy.

pub mod postgres;

pub use postgres::{
    copy_statement, encode_record, CopyError, CopyTarget, CopyTargetFactory, PgCopyTarget,
    PgTargetFactory, PostgresConfig, SessionRegistry, SessionState, TableSession,
};
