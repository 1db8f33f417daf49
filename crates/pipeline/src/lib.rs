//! dblog pipeline - the per-emitter event loop
//!
//! One pipeline owns one event source and one session registry, and runs
//! them from a single task. That single task is the ordering guarantee:
//! records for a table reach its session in arrival order, and no session
//! is ever touched concurrently.
//!
//! The loop multiplexes three things:
//! - events from the emitter (records and explicit flush requests)
//! - a periodic tick that sweeps sessions for timed flushes
//! - cancellation, which drains every session before returning

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use dblog_protocol::SourceEvent;
use dblog_sinks::postgres::{CopyTargetFactory, SessionRegistry};
use dblog_sources::{EventSource, EventSourceConfig};

pub struct Pipeline<F: CopyTargetFactory> {
    source_config: EventSourceConfig,
    registry: SessionRegistry<F>,
    tick: Duration,
}

impl<F: CopyTargetFactory> Pipeline<F> {
    pub fn new(
        source_config: EventSourceConfig,
        factory: F,
        flush_interval: Duration,
        tick: Duration,
    ) -> Self {
        Self {
            source_config,
            registry: SessionRegistry::new(factory, flush_interval),
            tick,
        }
    }

    /// Run until cancelled.
    ///
    /// A lost emitter connection is re-dialed at the source's reconnect
    /// delay; buffered rows survive the outage. Cancellation drains every
    /// session with a final explicit flush before returning.
    pub async fn run(mut self, cancel: CancellationToken) {
        let peer = self.source_config.peer();
        info!(peer = %peer, "pipeline starting");

        let mut source = tokio::select! {
            _ = cancel.cancelled() => {
                info!(peer = %peer, "pipeline cancelled before connect");
                return;
            }
            source = EventSource::connect_with_retry(self.source_config.clone()) => source,
        };

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    self.registry.flush_all(false).await;
                }

                result = source.next_event() => match result {
                    Ok(event) => self.dispatch(event).await,
                    Err(err) => {
                        warn!(peer = %peer, error = %err, "event source lost");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            reconnected = EventSource::connect_with_retry(self.source_config.clone()) => {
                                source = reconnected;
                            }
                        }
                    }
                },
            }
        }

        info!(peer = %peer, "pipeline stopping, draining sessions");
        self.registry.shutdown().await;
    }

    async fn dispatch(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Record { table, record } => {
                if let Err(err) = self.registry.ingest(&table, &record).await {
                    if err.is_fatal() {
                        error!(table = %table, error = %err, "table permanently failed");
                    } else {
                        warn!(table = %table, error = %err, "record buffered after stream error");
                    }
                }
            }
            SourceEvent::FlushTable { table } => {
                match self.registry.flush_table(&table).await {
                    Ok(rows) => info!(table = %table, rows, "explicit flush"),
                    Err(err) => warn!(table = %table, error = %err, "explicit flush failed"),
                }
            }
            SourceEvent::FlushAll => {
                let tables = self.registry.flush_all(true).await;
                info!(tables, "explicit flush of all tables");
            }
        }
    }
}

// Test module - only compiled during testing
#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
