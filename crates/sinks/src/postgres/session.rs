//! Per-table load session.
//!
//! A session lazily connects, opens a COPY stream on the first buffered row,
//! streams rows into it as they arrive, and closes the stream on flush. Rows
//! stay buffered until a flush completes, so a stream that dies mid-copy is
//! replayed in full on the next attempt. A rejected COPY statement is
//! unrecoverable and permanently darkens the session.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::error::CopyError;
use super::target::{CopyTarget, CopyTargetFactory};

/// What a session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No COPY stream open
    Idle,
    /// COPY stream open, rows in flight
    Loading,
    /// Statement permanently rejected; all traffic dropped
    Failed,
}

/// When a flush sweep should actually write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Flush whenever rows are buffered
    Explicit,
    /// Flush only when the interval has elapsed since the last flush
    Timed,
}

pub struct TableSession<F: CopyTargetFactory> {
    table: String,
    statement: String,
    factory: Arc<F>,
    target: Option<F::Target>,
    state: SessionState,
    pending: Vec<Bytes>,
    last_flush: Instant,
    dropped: u64,
}

impl<F: CopyTargetFactory> TableSession<F> {
    pub fn new(table: impl Into<String>, statement: String, factory: Arc<F>) -> Self {
        Self {
            table: table.into(),
            statement,
            factory,
            target: None,
            state: SessionState::Idle,
            pending: Vec::new(),
            last_flush: Instant::now(),
            dropped: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Rows buffered but not yet confirmed by a completed flush.
    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    /// Buffer a row and stream it into the open COPY, opening one if needed.
    ///
    /// A failed session swallows the row silently; transient stream errors
    /// keep the row buffered for the next flush attempt.
    pub async fn append(&mut self, row: Bytes) -> Result<(), CopyError> {
        if self.state == SessionState::Failed {
            self.dropped += 1;
            debug!(table = %self.table, dropped = self.dropped, "dropping row for failed session");
            return Ok(());
        }

        self.pending.push(row.clone());
        if self.state == SessionState::Idle {
            return self.open_and_replay().await;
        }

        let target = self
            .target
            .as_mut()
            .ok_or_else(|| CopyError::put_row(&self.table, "loading session has no target"))?;
        match target.put_row(row).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.reset_stream();
                Err(err)
            }
        }
    }

    /// Close out the open COPY stream and confirm the buffered rows.
    ///
    /// Under the timed policy the flush is skipped until the interval has
    /// elapsed. Returns the number of rows confirmed; zero means nothing
    /// needed flushing.
    pub async fn flush(&mut self, policy: FlushPolicy, interval: Duration) -> Result<usize, CopyError> {
        if self.state == SessionState::Failed || self.pending.is_empty() {
            return Ok(0);
        }
        if policy == FlushPolicy::Timed && self.last_flush.elapsed() < interval {
            return Ok(0);
        }

        // Rows retained from a broken stream need the stream reopened first.
        if self.state == SessionState::Idle {
            self.open_and_replay().await?;
        }

        let target = self
            .target
            .as_mut()
            .ok_or_else(|| CopyError::end_copy(&self.table, "loading session has no target"))?;
        match target.end().await {
            Ok(reported) => {
                let rows = self.pending.len();
                debug!(table = %self.table, rows, reported, "flush complete");
                self.pending.clear();
                self.state = SessionState::Idle;
                self.last_flush = Instant::now();
                Ok(rows)
            }
            Err(err) => {
                self.reset_stream();
                Err(err)
            }
        }
    }

    /// Connect (if needed), open the COPY stream, and stream every buffered
    /// row into it.
    async fn open_and_replay(&mut self) -> Result<(), CopyError> {
        if self.target.is_none() {
            let target = self.factory.connect(&self.table).await?;
            self.target = Some(target);
            info!(table = %self.table, "session connected");
        }
        let target = self
            .target
            .as_mut()
            .ok_or_else(|| CopyError::put_row(&self.table, "connect returned no target"))?;
        if let Err(err) = target.begin(&self.statement).await {
            if err.is_fatal() {
                error!(table = %self.table, %err, "statement rejected, abandoning session");
                self.state = SessionState::Failed;
                self.pending.clear();
                self.target = None;
            } else {
                self.reset_stream();
            }
            return Err(err);
        }
        self.state = SessionState::Loading;

        for row in self.pending.clone() {
            let target = self
                .target
                .as_mut()
                .ok_or_else(|| CopyError::put_row(&self.table, "loading session has no target"))?;
            if let Err(err) = target.put_row(row).await {
                self.reset_stream();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Drop the broken stream but keep the buffered rows for replay.
    fn reset_stream(&mut self) {
        warn!(table = %self.table, pending = self.pending.len(), "copy stream lost, rows retained");
        self.target = None;
        self.state = SessionState::Idle;
    }
}
