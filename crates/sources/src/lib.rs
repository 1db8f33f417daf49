//! dblog sources - event intake
//!
//! Events arrive over TCP from an emitter process. The source is an
//! outbound client: it dials the emitter, reads length-prefixed frames
//! into a reusable buffer, and yields decoded events one at a time.

pub mod tcp;

mod error;

pub use error::SourceError;
pub use tcp::{EventSource, EventSourceConfig};
