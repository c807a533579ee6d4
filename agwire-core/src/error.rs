//! Top-level error types for agwire
//!
//! Each component has its own error enum. [`Error`] flattens them into the
//! categories a caller usually acts on:
//!
//! - [`Error::InvalidEvent`] - Reject the event, keep the stream
//! - [`Error::NotAcceptable`] - Answer the client with 406 or fall back to JSON
//! - [`Error::Encoding`] - Replace the frame with an error frame
//! - [`Error::Transport`] - The sink is gone, abandon the stream
//! - [`Error::Config`] - Fix configuration

use thiserror::Error;

use crate::encoding::FrameError;
use crate::event::ValidationError;
use crate::negotiation::NegotiationError;

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {tier} tier: {reason}")]
    InvalidTier { tier: String, reason: String },

    #[error("{0}")]
    Invalid(String),
}

/// Top-level error type for agwire operations
#[derive(Debug, Error)]
pub enum Error {
    /// An event failed validation
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// No registered format satisfies the client
    #[error("not acceptable: {0}")]
    NotAcceptable(String),

    /// An event could not be serialized
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Writing or flushing the sink failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error (bad tier bounds, unknown format)
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if this is an event validation error
    pub fn is_invalid_event(&self) -> bool {
        matches!(self, Self::InvalidEvent(_))
    }

    /// Returns true if content negotiation failed
    pub fn is_not_acceptable(&self) -> bool {
        matches!(self, Self::NotAcceptable(_))
    }

    /// Returns true if this is an encoding error
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }

    /// Returns true if the sink failed
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if the stream cannot continue after this error
    ///
    /// Only transport failures end a stream. Everything else affects a
    /// single event or request.
    pub fn is_fatal(&self) -> bool {
        self.is_transport()
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::InvalidEvent(err.to_string())
    }
}

impl From<NegotiationError> for Error {
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::InvalidAcceptHeader(_) | NegotiationError::NoAcceptableType => {
                Self::NotAcceptable(err.to_string())
            }
            NegotiationError::NoSupportedTypes
            | NegotiationError::UnsupportedType(_)
            | NegotiationError::InvalidFormat(_) => Self::Config(err.to_string()),
        }
    }
}

impl From<FrameError> for Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Write(_) | FrameError::Flush(_) => Self::Transport(err.to_string()),
            FrameError::Encode(_) => Self::Encoding(err.to_string()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for agwire operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_only_transport_is_fatal() {
        assert!(Error::Transport("broken pipe".into()).is_fatal());

        assert!(!Error::Encoding("bad value".into()).is_fatal());
        assert!(!Error::NotAcceptable("text/html".into()).is_fatal());
        assert!(!Error::InvalidEvent("missing type".into()).is_fatal());
    }

    #[test]
    fn test_from_negotiation_error() {
        let err: Error = NegotiationError::NoAcceptableType.into();
        assert!(err.is_not_acceptable());

        let err: Error = NegotiationError::InvalidAcceptHeader("q=2.0".into()).into();
        assert!(err.is_not_acceptable());

        let err: Error = NegotiationError::UnsupportedType("text/html".into()).into();
        assert!(err.is_config());
    }

    #[test]
    fn test_from_frame_error() {
        let err: Error = FrameError::Write(io::Error::from(io::ErrorKind::BrokenPipe)).into();
        assert!(err.is_transport());
        assert!(err.to_string().contains("SSE write failed"));

        let err: Error = FrameError::Flush(io::Error::from(io::ErrorKind::TimedOut)).into();
        assert!(err.is_transport());
        assert!(err.to_string().contains("SSE flush failed"));

        let err: Error = FrameError::Encode(<serde_json::Error as serde::ser::Error>::custom(
            "unsupported value",
        ))
        .into();
        assert!(err.is_encoding());
        assert!(err.to_string().contains("event encoding failed"));
    }

    #[test]
    fn test_from_validation_and_config_errors() {
        let err: Error = ValidationError::MissingType.into();
        assert!(err.is_invalid_event());

        let err: Error = ConfigError::InvalidTier {
            tier: "small".into(),
            reason: "max_count must be greater than zero".into(),
        }
        .into();
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "configuration error: invalid small tier: max_count must be greater than zero"
        );
    }
}
