//! # agwire
//!
//! Transport and compatibility core for the AG-UI agent protocol.
//!
//! agwire turns a stream of agent [`Event`]s into bytes a browser can read:
//! it negotiates a payload format from the client's `Accept` header, frames
//! each event as a Server-Sent Event using pooled scratch buffers, and can
//! translate the stream into the older legacy event vocabulary.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use agwire_core::{Event, PoolManager, Role, SseWriter};
//!
//! # fn main() -> agwire_core::Result<()> {
//! let writer = SseWriter::new(Arc::new(PoolManager::default()));
//!
//! let mut out = Vec::new();
//! writer.write_event(&mut out, &Event::text_message_start("msg-1", Role::Assistant))?;
//! writer.write_event(&mut out, &Event::text_message_content("msg-1", "Hello"))?;
//!
//! let text = String::from_utf8_lossy(&out);
//! assert!(text.contains("data: {\"type\":\"TEXT_MESSAGE_CONTENT\""));
//! # Ok(())
//! # }
//! ```
//!
//! ## Content Negotiation
//!
//! ```
//! use agwire_core::ContentNegotiator;
//!
//! let negotiator = ContentNegotiator::new("application/json");
//! let chosen = negotiator
//!     .negotiate("application/json;q=0.8, application/x-protobuf;q=0.9")
//!     .unwrap();
//! assert_eq!(chosen, "application/x-protobuf");
//! ```
//!
//! ## Legacy Conversion
//!
//! ```
//! use agwire_core::{ConverterConfig, Event, LegacyConverter, LegacyEvent};
//!
//! let mut converter = LegacyConverter::new(ConverterConfig::new("thread-1", "run-1"));
//! let out = converter.convert(&Event::tool_call_start("tc-1", "search", None));
//! assert!(matches!(out[0], LegacyEvent::ActionExecutionStart { .. }));
//! ```

pub mod encoding;
pub mod error;
pub mod event;
pub mod legacy;
pub mod negotiation;
pub mod pool;

pub use encoding::{FrameCodec, FrameError, JsonCodec, SseWriter};
pub use error::{ConfigError, Error, Result};
pub use event::{
    validate_sequence, Event, EventKind, EventType, FunctionCall, Message, Role, ToolCall,
    ValidationError,
};
pub use legacy::{
    AnomalyKind, AnomalyPolicy, ConversionAnomaly, ConverterConfig, LegacyConverter, LegacyEvent,
    PredictStateMapping,
};
pub use negotiation::{
    formats, AcceptType, ClientCapabilities, ContentNegotiator, FormatSelector, NegotiationError,
    SelectionCriteria, TypeCapabilities,
};
pub use pool::{PoolConfig, PoolManager, PoolStats, Pooled, TierConfig};
