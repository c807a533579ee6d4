use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use bytes::BytesMut;
use serde_json::json;
use tracing::{error, warn};

use super::{FrameCodec, FrameError, JsonCodec};
use crate::event::Event;
use crate::negotiation::{formats, ContentNegotiator};
use crate::pool::{PoolManager, Pooled};

/// SSE label used for error frames.
pub const ERROR_EVENT_LABEL: &str = "error";

/// Bytes of framing around a payload: `event:`/`id:` lines, `data: ` and terminators.
const FRAME_OVERHEAD: usize = 96;

/// Writes events to a byte sink as Server-Sent Events frames.
///
/// Each frame is built completely in a pooled scratch buffer before the first
/// byte reaches the sink, then written and flushed. A sink failure therefore
/// never leaves half a frame behind from this writer.
pub struct SseWriter {
    pools: Arc<PoolManager>,
    negotiator: Arc<ContentNegotiator>,
    codecs: HashMap<&'static str, Arc<dyn FrameCodec>>,
}

impl SseWriter {
    /// Create a writer with the JSON codec and a default negotiator.
    pub fn new(pools: Arc<PoolManager>) -> Self {
        let mut writer = Self {
            pools,
            negotiator: Arc::new(ContentNegotiator::default()),
            codecs: HashMap::new(),
        };
        writer.register_codec(Arc::new(JsonCodec));
        writer
    }

    /// Use a shared negotiator for [`write_event_with_negotiation`](Self::write_event_with_negotiation).
    pub fn with_negotiator(mut self, negotiator: Arc<ContentNegotiator>) -> Self {
        self.negotiator = negotiator;
        self
    }

    /// Register a codec for every content type it reports.
    pub fn register_codec(&mut self, codec: Arc<dyn FrameCodec>) {
        for content_type in codec.content_types().iter().copied() {
            self.codecs.insert(content_type, Arc::clone(&codec));
        }
    }

    /// Codec registered for a content type, ignoring case.
    pub fn codec_for(&self, content_type: &str) -> Option<&Arc<dyn FrameCodec>> {
        self.codecs.get(content_type.to_ascii_lowercase().as_str())
    }

    /// The negotiator used by negotiated writes.
    pub fn negotiator(&self) -> &Arc<ContentNegotiator> {
        &self.negotiator
    }

    /// Write `event` as an unlabelled JSON frame.
    pub fn write_event<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        event: &Event,
    ) -> Result<(), FrameError> {
        self.write_labelled(sink, event, None, &JsonCodec)
    }

    /// Write `event` as a JSON frame with an `event: <label>` line.
    pub fn write_event_with_type<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        event: &Event,
        label: &str,
    ) -> Result<(), FrameError> {
        let label = (!label.is_empty()).then_some(label);
        self.write_labelled(sink, event, label, &JsonCodec)
    }

    /// Write an already-encoded payload as a bare `data:` frame.
    pub fn write_bytes<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        payload: &[u8],
    ) -> Result<(), FrameError> {
        let frame = self.build_frame(None, None, payload);
        self.emit(sink, frame, None)
    }

    /// Write an `error` frame carrying `err`'s message and the request id.
    pub fn write_error_event<W, E>(
        &self,
        sink: &mut W,
        err: &E,
        request_id: &str,
    ) -> Result<(), FrameError>
    where
        W: Write + ?Sized,
        E: fmt::Display + ?Sized,
    {
        let event = Event::custom(
            ERROR_EVENT_LABEL,
            Some(json!({
                "error": true,
                "message": err.to_string(),
                "request_id": request_id,
            })),
        );
        self.write_event_with_type(sink, &event, ERROR_EVENT_LABEL)
    }

    /// Negotiate a payload format from `accept` and write `event` with its codec.
    ///
    /// Falls back to JSON when negotiation fails or the chosen format has no
    /// codec. Returns the content type actually used.
    pub fn write_event_with_negotiation<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        event: &Event,
        accept: &str,
    ) -> Result<&'static str, FrameError> {
        let (content_type, codec) = self.select_codec(accept);
        self.write_labelled(sink, event, None, codec.as_ref())?;
        Ok(content_type)
    }

    /// Write `event` with a codec chosen earlier, e.g. by [`select_codec`](Self::select_codec).
    pub fn write_event_with_codec<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        event: &Event,
        codec: &dyn FrameCodec,
    ) -> Result<(), FrameError> {
        self.write_labelled(sink, event, None, codec)
    }

    /// Resolve the codec for an `Accept` header, falling back to JSON.
    pub fn select_codec(&self, accept: &str) -> (&'static str, Arc<dyn FrameCodec>) {
        match self.negotiator.negotiate(accept) {
            Ok(content_type) => self.resolve_codec(&content_type),
            Err(err) => {
                warn!(error = %err, accept = %accept, "content negotiation failed, using JSON");
                (formats::JSON, Arc::new(JsonCodec))
            }
        }
    }

    /// Codec for an already negotiated content type, falling back to JSON.
    pub fn resolve_codec(&self, content_type: &str) -> (&'static str, Arc<dyn FrameCodec>) {
        if let Some((name, codec)) = self
            .codecs
            .get_key_value(content_type.to_ascii_lowercase().as_str())
        {
            return (*name, Arc::clone(codec));
        }
        warn!(content_type = %content_type, "no codec for negotiated format, using JSON");
        (formats::JSON, Arc::new(JsonCodec))
    }

    fn write_labelled<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        event: &Event,
        label: Option<&str>,
        codec: &dyn FrameCodec,
    ) -> Result<(), FrameError> {
        let mut payload = self.scratch(event.size_hint());
        if let Err(err) = codec.encode_into(event, &mut payload) {
            error!(error = %err, event_type = %event.event_type(), "failed to encode event");
            return Err(err);
        }

        let id = event.id();
        let frame = self.build_frame(label, id.as_deref(), &payload);
        payload.put_secure();
        self.emit(sink, frame, Some(event))
    }

    fn build_frame(
        &self,
        label: Option<&str>,
        id: Option<&str>,
        payload: &[u8],
    ) -> Pooled<BytesMut> {
        let mut frame = self.scratch(payload.len() + FRAME_OVERHEAD);

        if let Some(label) = label {
            frame.extend_from_slice(b"event: ");
            frame.extend_from_slice(label.as_bytes());
            frame.extend_from_slice(b"\n");
        }
        if let Some(id) = id {
            frame.extend_from_slice(b"id: ");
            frame.extend_from_slice(id.as_bytes());
            frame.extend_from_slice(b"\n");
        }

        frame.extend_from_slice(b"data: ");
        let mut rest = payload;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n' || *b == b'\r') {
            frame.extend_from_slice(&rest[..pos]);
            frame.extend_from_slice(if rest[pos] == b'\n' { b"\\n" } else { b"\\r" });
            rest = &rest[pos + 1..];
        }
        frame.extend_from_slice(rest);
        frame.extend_from_slice(b"\n\n");
        frame
    }

    fn emit<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        frame: Pooled<BytesMut>,
        event: Option<&Event>,
    ) -> Result<(), FrameError> {
        let event_type = event.map(|e| e.event_type().as_str()).unwrap_or("bytes");

        let result = match sink.write_all(&frame) {
            Err(err) => {
                error!(error = %err, event_type, "failed to write SSE frame");
                Err(FrameError::Write(err))
            }
            Ok(()) => sink.flush().map_err(|err| {
                error!(error = %err, event_type, "failed to flush SSE frame");
                FrameError::Flush(err)
            }),
        };
        frame.put_secure();
        result
    }

    fn scratch(&self, size: usize) -> Pooled<BytesMut> {
        self.pools
            .get_buffer_safe(size)
            .unwrap_or_else(|| Pooled::detached(BytesMut::with_capacity(size)))
    }
}

impl Default for SseWriter {
    fn default() -> Self {
        Self::new(Arc::new(PoolManager::default()))
    }
}

impl fmt::Debug for SseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codecs: Vec<_> = self.codecs.keys().collect();
        codecs.sort();
        f.debug_struct("SseWriter")
            .field("codecs", &codecs)
            .field("preferred_type", &self.negotiator.preferred_type())
            .finish()
    }
}
