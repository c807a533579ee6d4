//! AG-UI protocol event model.
//!
//! Events are an immutable envelope ([`Event`]) around a closed set of kinds
//! ([`EventKind`]). On the wire each event is a JSON object tagged with a
//! SCREAMING_SNAKE_CASE `type` field and camelCase payload fields:
//!
//! ```json
//! {"type":"TEXT_MESSAGE_CONTENT","messageId":"msg-1","delta":"Hi","timestamp":1700000000000}
//! ```
//!
//! Extension happens through [`EventKind::Custom`] and [`EventKind::Raw`],
//! never by adding kinds at runtime.

mod kind;
mod message;
mod validate;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use kind::{EventKind, EventType, Role};
pub use message::{FunctionCall, Message, ToolCall};
pub use validate::{validate_sequence, ValidationError};

/// A single AG-UI protocol event.
///
/// The kind-specific payload is flattened next to the common envelope
/// fields, so the serialized form is a single flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    kind: EventKind,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
    /// Original upstream payload, if this event was translated from another system.
    #[serde(rename = "rawEvent", default, skip_serializing_if = "Option::is_none")]
    raw_event: Option<Value>,
}

impl Event {
    /// Wrap a kind in an event stamped with the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Some(now_millis()),
            raw_event: None,
        }
    }

    /// Wrap a kind without a timestamp.
    pub fn untimed(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: None,
            raw_event: None,
        }
    }

    /// Replace the timestamp.
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    /// Attach the original upstream payload.
    pub fn with_raw_event(mut self, raw: Value) -> Self {
        self.raw_event = Some(raw);
        self
    }

    /// The event's payload.
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// The wire discriminator of this event.
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// Milliseconds since the Unix epoch, if stamped.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// The upstream event this one was derived from, if kept.
    pub fn raw_event(&self) -> Option<&Value> {
        self.raw_event.as_ref()
    }

    /// Frame identifier `<TYPE>_<timestampMs>`, available when the event is timestamped.
    pub fn id(&self) -> Option<String> {
        self.timestamp
            .map(|ts| format!("{}_{}", self.event_type(), ts))
    }

    /// Check the structural rules for this event's kind.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_kind(&self.kind)
    }

    /// Parse and validate an event from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate and convert an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let type_name = match value.get("type") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => return Err(ValidationError::MissingType),
        };
        if type_name.parse::<EventType>().is_err() {
            return Err(ValidationError::UnknownType(type_name));
        }

        let event: Event =
            serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    // ===== Constructors =====

    /// Create a `RUN_STARTED` event.
    pub fn run_started(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::new(EventKind::RunStarted {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            parent_run_id: None,
            input: None,
        })
    }

    /// Create a `RUN_FINISHED` event.
    pub fn run_finished(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::new(EventKind::RunFinished {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            result: None,
        })
    }

    /// Create a `RUN_ERROR` event without an error code.
    pub fn run_error(message: impl Into<String>) -> Self {
        Self::new(EventKind::RunError {
            message: message.into(),
            code: None,
            run_id: None,
        })
    }

    /// Create a `STEP_STARTED` event.
    pub fn step_started(step_name: impl Into<String>) -> Self {
        Self::new(EventKind::StepStarted {
            step_name: step_name.into(),
        })
    }

    /// Create a `STEP_FINISHED` event.
    pub fn step_finished(step_name: impl Into<String>) -> Self {
        Self::new(EventKind::StepFinished {
            step_name: step_name.into(),
        })
    }

    /// Create a `TEXT_MESSAGE_START` event.
    pub fn text_message_start(message_id: impl Into<String>, role: Role) -> Self {
        Self::new(EventKind::TextMessageStart {
            message_id: message_id.into(),
            role,
        })
    }

    /// Create a `TEXT_MESSAGE_CONTENT` event carrying one delta.
    pub fn text_message_content(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::new(EventKind::TextMessageContent {
            message_id: message_id.into(),
            delta: delta.into(),
        })
    }

    /// Create a `TEXT_MESSAGE_END` event.
    pub fn text_message_end(message_id: impl Into<String>) -> Self {
        Self::new(EventKind::TextMessageEnd {
            message_id: message_id.into(),
        })
    }

    /// Create a `TOOL_CALL_START` event, optionally linked to a parent message.
    pub fn tool_call_start(
        tool_call_id: impl Into<String>,
        tool_call_name: impl Into<String>,
        parent_message_id: Option<String>,
    ) -> Self {
        Self::new(EventKind::ToolCallStart {
            tool_call_id: tool_call_id.into(),
            tool_call_name: tool_call_name.into(),
            parent_message_id,
        })
    }

    /// Create a `TOOL_CALL_ARGS` event carrying one argument fragment.
    pub fn tool_call_args(tool_call_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCallArgs {
            tool_call_id: tool_call_id.into(),
            delta: delta.into(),
        })
    }

    /// Create a `TOOL_CALL_END` event.
    pub fn tool_call_end(tool_call_id: impl Into<String>) -> Self {
        Self::new(EventKind::ToolCallEnd {
            tool_call_id: tool_call_id.into(),
        })
    }

    /// Create a `STATE_SNAPSHOT` event.
    pub fn state_snapshot(snapshot: Value) -> Self {
        Self::new(EventKind::StateSnapshot { snapshot })
    }

    /// Create a `STATE_DELTA` event from an RFC 6902 patch.
    pub fn state_delta(delta: json_patch::Patch) -> Self {
        Self::new(EventKind::StateDelta { delta })
    }

    /// Create a `MESSAGES_SNAPSHOT` event.
    pub fn messages_snapshot(messages: Vec<Message>) -> Self {
        Self::new(EventKind::MessagesSnapshot { messages })
    }

    /// Create a `CUSTOM` event.
    pub fn custom(name: impl Into<String>, value: Option<Value>) -> Self {
        Self::new(EventKind::Custom {
            name: name.into(),
            value,
        })
    }

    /// Create a `RAW` event wrapping an upstream payload.
    pub fn raw(event: Value, source: Option<String>) -> Self {
        Self::new(EventKind::Raw { event, source })
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
