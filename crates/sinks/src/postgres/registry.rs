//! Routing of decoded records to per-table sessions.
//!
//! The registry owns every session for one event source and is driven from a
//! single task, so sessions never see concurrent access. The first record
//! seen for a table fixes its column list and COPY statement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use dblog_protocol::Record;

use super::encode::{copy_statement, encode_record};
use super::error::CopyError;
use super::session::{FlushPolicy, SessionState, TableSession};
use super::target::CopyTargetFactory;

pub struct SessionRegistry<F: CopyTargetFactory> {
    factory: Arc<F>,
    flush_interval: Duration,
    sessions: HashMap<String, TableSession<F>>,
}

impl<F: CopyTargetFactory> SessionRegistry<F> {
    pub fn new(factory: F, flush_interval: Duration) -> Self {
        Self {
            factory: Arc::new(factory),
            flush_interval,
            sessions: HashMap::new(),
        }
    }

    /// Number of tables with a session, dark ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_state(&self, table: &str) -> Option<SessionState> {
        self.sessions.get(table).map(|s| s.state())
    }

    /// Encode a record and hand it to the table's session, creating the
    /// session on first sight of the table.
    pub async fn ingest(&mut self, table: &str, record: &Record) -> Result<(), CopyError> {
        if !self.sessions.contains_key(table) {
            let statement = copy_statement(table, record);
            info!(table, statement = %statement, "new table session");
            let session = TableSession::new(table, statement, Arc::clone(&self.factory));
            self.sessions.insert(table.to_string(), session);
        }

        let row = encode_record(table, record);
        // Lookup cannot fail; the session was inserted above.
        match self.sessions.get_mut(table) {
            Some(session) => session.append(row).await,
            None => Ok(()),
        }
    }

    /// Explicitly flush one table. Unknown tables are a no-op.
    pub async fn flush_table(&mut self, table: &str) -> Result<usize, CopyError> {
        match self.sessions.get_mut(table) {
            Some(session) => session.flush(FlushPolicy::Explicit, self.flush_interval).await,
            None => Ok(0),
        }
    }

    /// Sweep every session, flushing those the policy selects.
    ///
    /// Per-table failures are logged and do not stop the sweep. Returns the
    /// number of tables that flushed at least one row.
    pub async fn flush_all(&mut self, explicit: bool) -> usize {
        let policy = if explicit {
            FlushPolicy::Explicit
        } else {
            FlushPolicy::Timed
        };
        let mut flushed = 0;
        for (table, session) in &mut self.sessions {
            match session.flush(policy, self.flush_interval).await {
                Ok(0) => {}
                Ok(rows) => {
                    info!(table = %table, rows, "flushed");
                    flushed += 1;
                }
                Err(error) => warn!(table = %table, %error, "flush failed"),
            }
        }
        flushed
    }

    /// Final drain before the registry goes away.
    pub async fn shutdown(&mut self) {
        let flushed = self.flush_all(true).await;
        info!(tables = self.sessions.len(), flushed, "registry shut down");
        self.sessions.clear();
    }
}
