//! Content negotiation for event payload formats.
//!
//! A [`ContentNegotiator`] holds a registry of [`TypeCapabilities`] and picks
//! one of them for a client's `Accept` header. Scoring combines the client's
//! quality factor with the server-side priority:
//!
//! | Match | Quality used |
//! |-------|--------------|
//! | exact or alias | `q` |
//! | `main/*` | `q * 0.9` |
//! | `*/*` | `q` |
//!
//! `score = quality + priority * 0.4`. Candidates within `0.03` of the best
//! score yield to the preferred type.

pub mod accept;
pub mod negotiator;
pub mod selector;

pub use accept::{
    format_media_type, match_media_types, parse_accept_header, parse_media_type, AcceptType,
};
pub use negotiator::{ContentNegotiator, TypeCapabilities};
pub use selector::{ClientCapabilities, FormatSelector, SelectionCriteria};

/// Well-known format names registered by default.
pub mod formats {
    pub const JSON: &str = "application/json";
    pub const PROTOBUF: &str = "application/x-protobuf";
    pub const AGUI_JSON: &str = "application/vnd.ag-ui+json";
    /// SSE transport range. Not a payload format.
    pub const EVENT_STREAM: &str = "text/event-stream";
}

/// Errors raised while negotiating or configuring formats.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NegotiationError {
    #[error("no supported types registered")]
    NoSupportedTypes,

    #[error("invalid Accept header: {0}")]
    InvalidAcceptHeader(String),

    #[error("no acceptable type")]
    NoAcceptableType,

    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("invalid format registration: {0}")]
    InvalidFormat(String),
}
