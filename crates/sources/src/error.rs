use thiserror::Error;

/// Event source errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to reach the emitter
    #[error("connect to {peer}: {source}")]
    Connect {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The emitter closed the connection
    #[error("connection to {peer} closed")]
    Closed { peer: String },

    /// A frame length prefix exceeds the limit; the stream cannot be
    /// resynchronized past it
    #[error("frame size {size} exceeds limit {limit}")]
    FrameTooLarge { size: u32, limit: u32 },
}

impl SourceError {
    /// Whether the connection should be re-established.
    pub fn needs_reconnect(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Closed { .. } | Self::FrameTooLarge { .. }
        )
    }
}
