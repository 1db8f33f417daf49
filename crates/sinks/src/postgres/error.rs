use std::time::Duration;

use thiserror::Error;

type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while moving rows into PostgreSQL.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Establishing the database connection failed.
    #[error("connect to {params}: {source}")]
    Connect {
        params: String,
        #[source]
        source: Source,
    },

    /// The connection attempt did not complete within the deadline.
    #[error("connect to {params}: timed out after {timeout:?}")]
    ConnectTimeout { params: String, timeout: Duration },

    /// The server rejected the COPY statement itself. The statement will
    /// never succeed for this table, so the session goes dark.
    #[error("table '{table}': statement rejected: {source}")]
    StatementRejected {
        table: String,
        #[source]
        source: Source,
    },

    /// Writing a row into an open COPY stream failed.
    #[error("table '{table}': put row: {source}")]
    PutRow {
        table: String,
        #[source]
        source: Source,
    },

    /// Closing out a COPY stream failed; buffered rows are kept for retry.
    #[error("table '{table}': end copy: {source}")]
    EndCopy {
        table: String,
        #[source]
        source: Source,
    },
}

impl CopyError {
    pub fn connect(params: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::Connect {
            params: params.into(),
            source: source.into(),
        }
    }

    pub fn connect_timeout(params: impl Into<String>, timeout: Duration) -> Self {
        Self::ConnectTimeout {
            params: params.into(),
            timeout,
        }
    }

    pub fn statement_rejected(table: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::StatementRejected {
            table: table.into(),
            source: source.into(),
        }
    }

    pub fn put_row(table: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::PutRow {
            table: table.into(),
            source: source.into(),
        }
    }

    pub fn end_copy(table: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::EndCopy {
            table: table.into(),
            source: source.into(),
        }
    }

    /// Whether the error permanently poisons the table session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StatementRejected { .. })
    }
}
