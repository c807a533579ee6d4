//! Event payload codecs and Server-Sent Events framing.

mod sizing;
mod sse;

pub use sizing::{
    base_size, batch_size_hint, DEFAULT_EVENT_SIZE, LARGE_EVENT_SIZE, MEDIUM_EVENT_SIZE,
    SMALL_EVENT_SIZE, VERY_LARGE_EVENT_SIZE,
};
pub use sse::{SseWriter, ERROR_EVENT_LABEL};

use bytes::{BufMut, BytesMut};

use crate::event::Event;
use crate::negotiation::formats;

/// Errors raised while encoding or writing a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The event could not be serialized. Nothing was written.
    #[error("event encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("SSE write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("SSE flush failed: {0}")]
    Flush(#[source] std::io::Error),
}

impl FrameError {
    /// True for sink failures, after which the stream should be abandoned.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Write(_) | Self::Flush(_))
    }
}

/// Serializes an event payload for one content type.
pub trait FrameCodec: Send + Sync {
    /// Content types this codec produces.
    fn content_types(&self) -> &[&'static str];

    /// Append the encoded event to `buf`.
    fn encode_into(&self, event: &Event, buf: &mut BytesMut) -> Result<(), FrameError>;
}

/// Compact JSON, for `application/json` and `application/vnd.ag-ui+json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl FrameCodec for JsonCodec {
    fn content_types(&self) -> &[&'static str] {
        &[formats::JSON, formats::AGUI_JSON]
    }

    fn encode_into(&self, event: &Event, buf: &mut BytesMut) -> Result<(), FrameError> {
        serde_json::to_writer(buf.writer(), event).map_err(FrameError::Encode)
    }
}

#[cfg(test)]
#[path = "encoding_tests.rs"]
mod tests;
