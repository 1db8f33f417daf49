//! Connection and COPY-stream handling behind a narrow trait seam.
//!
//! `TableSession` drives a [`CopyTarget`]; production code plugs in
//! [`PgCopyTarget`] over tokio-postgres, tests plug in a scripted double.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::SinkExt;
use tokio_postgres::{CopyInSink, NoTls};
use tracing::{debug, warn};

use super::config::PostgresConfig;
use super::error::CopyError;

/// One table's view of the database: open a COPY stream, push rows into it,
/// close it out.
#[async_trait]
pub trait CopyTarget: Send {
    /// Open a COPY stream with the given statement.
    async fn begin(&mut self, statement: &str) -> Result<(), CopyError>;

    /// Write one encoded row into the open stream.
    async fn put_row(&mut self, row: Bytes) -> Result<(), CopyError>;

    /// Close the stream and return the server's row count.
    async fn end(&mut self) -> Result<u64, CopyError>;
}

/// Creates a [`CopyTarget`] per table, on demand.
#[async_trait]
pub trait CopyTargetFactory: Send + Sync {
    type Target: CopyTarget;

    async fn connect(&self, table: &str) -> Result<Self::Target, CopyError>;
}

/// A dedicated tokio-postgres connection for one table.
pub struct PgCopyTarget {
    table: String,
    client: tokio_postgres::Client,
    sink: Option<Pin<Box<CopyInSink<Bytes>>>>,
}

#[async_trait]
impl CopyTarget for PgCopyTarget {
    async fn begin(&mut self, statement: &str) -> Result<(), CopyError> {
        debug!(table = %self.table, statement, "opening copy stream");
        let sink = self
            .client
            .copy_in(statement)
            .await
            .map_err(|e| CopyError::statement_rejected(&self.table, e))?;
        self.sink = Some(Box::pin(sink));
        Ok(())
    }

    async fn put_row(&mut self, row: Bytes) -> Result<(), CopyError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| CopyError::put_row(&self.table, "no open copy stream"))?;
        sink.send(row)
            .await
            .map_err(|e| CopyError::put_row(&self.table, e))
    }

    async fn end(&mut self) -> Result<u64, CopyError> {
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| CopyError::end_copy(&self.table, "no open copy stream"))?;
        sink.as_mut()
            .finish()
            .await
            .map_err(|e| CopyError::end_copy(&self.table, e))
    }
}

/// Connects one session-scoped client per table.
pub struct PgTargetFactory {
    config: PostgresConfig,
}

impl PgTargetFactory {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CopyTargetFactory for PgTargetFactory {
    type Target = PgCopyTarget;

    async fn connect(&self, table: &str) -> Result<PgCopyTarget, CopyError> {
        let timeout = self.config.connect_timeout();
        let params = self.config.params();
        let connect = tokio_postgres::connect(&params, NoTls);
        let (client, connection) = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| CopyError::connect_timeout(self.config.display_params(), timeout))?
            .map_err(|e| CopyError::connect(self.config.display_params(), e))?;

        // The connection future drives the socket; it finishes on its own
        // when the client is dropped.
        let conn_table = table.to_string();
        tokio::spawn(async move {
            if let Err(error) = connection.await {
                warn!(table = %conn_table, %error, "database connection closed");
            }
        });

        debug!(table, params = %self.config.display_params(), "connected");
        Ok(PgCopyTarget {
            table: table.to_string(),
            client,
            sink: None,
        })
    }
}
