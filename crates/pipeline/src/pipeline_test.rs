//! End-to-end tests for the pipeline event loop over a local emitter

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use dblog_protocol::{encode_frame, Field, FieldValue, Record, SourceEvent};
use dblog_sinks::postgres::{CopyError, CopyTarget, CopyTargetFactory};
use dblog_sources::EventSourceConfig;

use super::Pipeline;

const FLUSH_INTERVAL: Duration = Duration::from_secs(60);
const TICK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Begin(String),
    PutRow(Vec<u8>),
    End,
}

#[derive(Clone, Default)]
struct RecordingFactory {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingFactory {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, want: fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| want(c)).count()
    }
}

struct RecordingTarget {
    calls: Arc<Mutex<Vec<Call>>>,
    rows: u64,
}

#[async_trait]
impl CopyTargetFactory for RecordingFactory {
    type Target = RecordingTarget;

    async fn connect(&self, _table: &str) -> Result<RecordingTarget, CopyError> {
        Ok(RecordingTarget {
            calls: Arc::clone(&self.calls),
            rows: 0,
        })
    }
}

#[async_trait]
impl CopyTarget for RecordingTarget {
    async fn begin(&mut self, statement: &str) -> Result<(), CopyError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Begin(statement.to_string()));
        self.rows = 0;
        Ok(())
    }

    async fn put_row(&mut self, row: Bytes) -> Result<(), CopyError> {
        self.calls.lock().unwrap().push(Call::PutRow(row.to_vec()));
        self.rows += 1;
        Ok(())
    }

    async fn end(&mut self) -> Result<u64, CopyError> {
        self.calls.lock().unwrap().push(Call::End);
        Ok(self.rows)
    }
}

fn record_event(table: &str, id: i64) -> SourceEvent {
    SourceEvent::Record {
        table: table.to_string(),
        record: Record::new(vec![Field::new("id", FieldValue::Int(id))]),
    }
}

/// Bind an emitter, spawn the pipeline against it, and hand the accepted
/// stream to the test for scripting.
async fn start(factory: &RecordingFactory, cancel: &CancellationToken) -> TcpStream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let pipeline = Pipeline::new(
        EventSourceConfig::new("127.0.0.1", addr.port()),
        factory.clone(),
        FLUSH_INTERVAL,
        TICK,
    );
    tokio::spawn(pipeline.run(cancel.clone()));

    let (stream, _) = listener.accept().await.unwrap();
    stream
}

/// Poll until the condition holds or a couple of seconds pass.
async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_records_flow_to_their_table() {
    let factory = RecordingFactory::default();
    let cancel = CancellationToken::new();
    let mut emitter = start(&factory, &cancel).await;

    emitter
        .write_all(&encode_frame(&record_event("conn_log", 1)))
        .await
        .unwrap();
    emitter
        .write_all(&encode_frame(&record_event("conn_log", 2)))
        .await
        .unwrap();

    wait_for(|| factory.count(|c| matches!(c, Call::PutRow(_))) == 2).await;
    assert_eq!(
        factory.calls()[0],
        Call::Begin("COPY conn_log (id) FROM STDIN".to_string())
    );
    cancel.cancel();
}

#[tokio::test]
async fn test_flush_all_event_drains_open_loads() {
    let factory = RecordingFactory::default();
    let cancel = CancellationToken::new();
    let mut emitter = start(&factory, &cancel).await;

    emitter
        .write_all(&encode_frame(&record_event("conn_log", 1)))
        .await
        .unwrap();
    emitter
        .write_all(&encode_frame(&SourceEvent::FlushAll))
        .await
        .unwrap();

    wait_for(|| factory.count(|c| matches!(c, Call::End)) == 1).await;
    cancel.cancel();
}

#[tokio::test]
async fn test_flush_table_event_targets_one_table() {
    let factory = RecordingFactory::default();
    let cancel = CancellationToken::new();
    let mut emitter = start(&factory, &cancel).await;

    emitter
        .write_all(&encode_frame(&record_event("conn_log", 1)))
        .await
        .unwrap();
    emitter
        .write_all(&encode_frame(&record_event("dns_log", 2)))
        .await
        .unwrap();
    emitter
        .write_all(&encode_frame(&SourceEvent::FlushTable {
            table: "conn_log".to_string(),
        }))
        .await
        .unwrap();

    wait_for(|| factory.count(|c| matches!(c, Call::End)) == 1).await;
    // dns_log still has its load open
    assert_eq!(factory.count(|c| matches!(c, Call::PutRow(_))), 2);
    cancel.cancel();
}

#[tokio::test]
async fn test_cancellation_drains_before_returning() {
    let factory = RecordingFactory::default();
    let cancel = CancellationToken::new();
    let mut emitter = start(&factory, &cancel).await;

    emitter
        .write_all(&encode_frame(&record_event("conn_log", 1)))
        .await
        .unwrap();

    wait_for(|| factory.count(|c| matches!(c, Call::PutRow(_))) == 1).await;
    cancel.cancel();
    wait_for(|| factory.count(|c| matches!(c, Call::End)) == 1).await;
}

#[tokio::test]
async fn test_emitter_restart_is_survived() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let factory = RecordingFactory::default();
    let cancel = CancellationToken::new();

    let mut source_config = EventSourceConfig::new("127.0.0.1", addr.port());
    source_config.reconnect_delay = Duration::from_millis(20);
    let pipeline = Pipeline::new(source_config, factory.clone(), FLUSH_INTERVAL, TICK);
    tokio::spawn(pipeline.run(cancel.clone()));

    // First connection: one record, then the emitter dies
    let (mut emitter, _) = listener.accept().await.unwrap();
    emitter
        .write_all(&encode_frame(&record_event("conn_log", 1)))
        .await
        .unwrap();
    wait_for(|| factory.count(|c| matches!(c, Call::PutRow(_))) == 1).await;
    drop(emitter);

    // The pipeline dials back in and keeps going
    let (mut emitter, _) = listener.accept().await.unwrap();
    emitter
        .write_all(&encode_frame(&record_event("conn_log", 2)))
        .await
        .unwrap();
    wait_for(|| factory.count(|c| matches!(c, Call::PutRow(_))) == 2).await;
    cancel.cancel();
}
