//! TCP event source
//!
//! Outbound client connection to one event emitter.
//!
//! # Protocol
//!
//! Each event is framed with a 4-byte big-endian length prefix:
//! ```text
//! [4 bytes: length (big-endian)][N bytes: event payload]
//! ```
//!
//! Frames accumulate in a `BytesMut`; a frame is only consumed once it is
//! complete, so short reads and frames split across reads reassemble
//! transparently. A frame that fails to decode is logged and skipped; the
//! connection lives on.

use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use dblog_protocol::{decode_event, SourceEvent, LENGTH_PREFIX_SIZE, MAX_EVENT_SIZE};

use crate::error::SourceError;

/// Default delay between reconnect attempts
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default read buffer size (64KB)
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Event source configuration
#[derive(Debug, Clone)]
pub struct EventSourceConfig {
    /// Emitter host to dial
    pub host: String,

    /// Emitter port
    pub port: u16,

    /// Delay between reconnect attempts
    pub reconnect_delay: Duration,

    /// Read buffer size
    pub buffer_size: usize,
}

impl Default for EventSourceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 47757,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl EventSourceConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// The emitter address to dial
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A connected event source.
#[derive(Debug)]
pub struct EventSource {
    config: EventSourceConfig,
    stream: TcpStream,
    buf: BytesMut,
}

impl EventSource {
    /// Dial the emitter once.
    pub async fn connect(config: EventSourceConfig) -> Result<Self, SourceError> {
        let peer = config.peer();
        let stream = TcpStream::connect(&peer)
            .await
            .map_err(|source| SourceError::Connect {
                peer: peer.clone(),
                source,
            })?;
        info!(peer = %peer, "connected to emitter");
        let buffer_size = config.buffer_size;
        Ok(Self {
            config,
            stream,
            buf: BytesMut::with_capacity(buffer_size),
        })
    }

    /// Dial the emitter, retrying at a fixed delay until it answers.
    ///
    /// Loops forever; wrap in a `select!` with a cancellation branch.
    pub async fn connect_with_retry(config: EventSourceConfig) -> Self {
        let delay = config.reconnect_delay;
        loop {
            match Self::connect(config.clone()).await {
                Ok(source) => return source,
                Err(error) => {
                    warn!(peer = %config.peer(), %error, retry_in = ?delay, "connect failed");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// The emitter address this source reads from.
    pub fn peer(&self) -> String {
        self.config.peer()
    }

    pub fn config(&self) -> &EventSourceConfig {
        &self.config
    }

    /// Read the next decodable event.
    ///
    /// Cancel safe: a frame is consumed from the buffer only once it is
    /// complete, and the underlying read never discards partial data.
    pub async fn next_event(&mut self) -> Result<SourceEvent, SourceError> {
        loop {
            while let Some(frame) = self.take_frame()? {
                match decode_event(&frame) {
                    Ok(event) => return Ok(event),
                    Err(error) => {
                        warn!(peer = %self.config.peer(), %error, "skipping undecodable frame");
                    }
                }
            }

            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                debug!(peer = %self.config.peer(), "emitter closed the connection");
                return Err(SourceError::Closed {
                    peer: self.config.peer(),
                });
            }
        }
    }

    /// Pop one complete frame off the buffer, if one has fully arrived.
    fn take_frame(&mut self) -> Result<Option<Bytes>, SourceError> {
        if self.buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let frame_len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        if frame_len > MAX_EVENT_SIZE {
            return Err(SourceError::FrameTooLarge {
                size: frame_len,
                limit: MAX_EVENT_SIZE,
            });
        }

        let total = LENGTH_PREFIX_SIZE + frame_len as usize;
        if self.buf.len() < total {
            return Ok(None);
        }

        self.buf.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(self.buf.split_to(frame_len as usize).freeze()))
    }
}

// Test module - only compiled during testing
#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
