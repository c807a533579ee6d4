use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::Message;

/// The closed set of AG-UI event kinds and their payloads.
///
/// Serialized with a `type` field in SCREAMING_SNAKE_CASE and camelCase
/// payload fields, as per the AG-UI specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum EventKind {
    // ===== Lifecycle Events =====
    /// Agent run started.
    RunStarted {
        thread_id: String,
        run_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_run_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Value>,
    },

    /// Agent run finished successfully.
    RunFinished {
        thread_id: String,
        run_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },

    /// Agent run failed.
    RunError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },

    /// A named step within a run started.
    StepStarted { step_name: String },

    /// A named step within a run finished.
    StepFinished { step_name: String },

    // ===== Text Message Events =====
    /// Start of a streamed text message.
    TextMessageStart { message_id: String, role: Role },

    /// Text delta to append to an open message.
    TextMessageContent { message_id: String, delta: String },

    /// End of a streamed text message.
    TextMessageEnd { message_id: String },

    // ===== Tool Call Events =====
    /// Start of a streamed tool call.
    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },

    /// JSON argument fragment for an open tool call.
    ToolCallArgs { tool_call_id: String, delta: String },

    /// End of a tool call's arguments.
    ToolCallEnd { tool_call_id: String },

    // ===== State Management Events =====
    /// Complete state snapshot.
    StateSnapshot { snapshot: Value },

    /// Incremental state update (RFC 6902 JSON Patch).
    StateDelta { delta: json_patch::Patch },

    /// Complete conversation history.
    MessagesSnapshot { messages: Vec<Message> },

    // ===== Extension Events =====
    /// Application-defined event.
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },

    /// Passthrough of an external system's event.
    Raw {
        event: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
}

impl EventKind {
    /// The wire discriminator for this kind.
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::RunStarted { .. } => EventType::RunStarted,
            EventKind::RunFinished { .. } => EventType::RunFinished,
            EventKind::RunError { .. } => EventType::RunError,
            EventKind::StepStarted { .. } => EventType::StepStarted,
            EventKind::StepFinished { .. } => EventType::StepFinished,
            EventKind::TextMessageStart { .. } => EventType::TextMessageStart,
            EventKind::TextMessageContent { .. } => EventType::TextMessageContent,
            EventKind::TextMessageEnd { .. } => EventType::TextMessageEnd,
            EventKind::ToolCallStart { .. } => EventType::ToolCallStart,
            EventKind::ToolCallArgs { .. } => EventType::ToolCallArgs,
            EventKind::ToolCallEnd { .. } => EventType::ToolCallEnd,
            EventKind::StateSnapshot { .. } => EventType::StateSnapshot,
            EventKind::StateDelta { .. } => EventType::StateDelta,
            EventKind::MessagesSnapshot { .. } => EventType::MessagesSnapshot,
            EventKind::Custom { .. } => EventType::Custom,
            EventKind::Raw { .. } => EventType::Raw,
        }
    }
}

/// Fieldless mirror of [`EventKind`], used for discriminator parsing and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RunStarted,
    RunFinished,
    RunError,
    StepStarted,
    StepFinished,
    TextMessageStart,
    TextMessageContent,
    TextMessageEnd,
    ToolCallStart,
    ToolCallArgs,
    ToolCallEnd,
    StateSnapshot,
    StateDelta,
    MessagesSnapshot,
    Custom,
    Raw,
}

impl EventType {
    pub const ALL: [EventType; 16] = [
        EventType::RunStarted,
        EventType::RunFinished,
        EventType::RunError,
        EventType::StepStarted,
        EventType::StepFinished,
        EventType::TextMessageStart,
        EventType::TextMessageContent,
        EventType::TextMessageEnd,
        EventType::ToolCallStart,
        EventType::ToolCallArgs,
        EventType::ToolCallEnd,
        EventType::StateSnapshot,
        EventType::StateDelta,
        EventType::MessagesSnapshot,
        EventType::Custom,
        EventType::Raw,
    ];

    /// Wire name, e.g. `RUN_STARTED`.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::RunStarted => "RUN_STARTED",
            EventType::RunFinished => "RUN_FINISHED",
            EventType::RunError => "RUN_ERROR",
            EventType::StepStarted => "STEP_STARTED",
            EventType::StepFinished => "STEP_FINISHED",
            EventType::TextMessageStart => "TEXT_MESSAGE_START",
            EventType::TextMessageContent => "TEXT_MESSAGE_CONTENT",
            EventType::TextMessageEnd => "TEXT_MESSAGE_END",
            EventType::ToolCallStart => "TOOL_CALL_START",
            EventType::ToolCallArgs => "TOOL_CALL_ARGS",
            EventType::ToolCallEnd => "TOOL_CALL_END",
            EventType::StateSnapshot => "STATE_SNAPSHOT",
            EventType::StateDelta => "STATE_DELTA",
            EventType::MessagesSnapshot => "MESSAGES_SNAPSHOT",
            EventType::Custom => "CUSTOM",
            EventType::Raw => "RAW",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    System,
    Assistant,
    User,
    /// Tool result author. Not permitted on text message events.
    Tool,
}

impl Role {
    /// Wire name, e.g. `assistant`.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::System => "system",
            Role::Assistant => "assistant",
            Role::User => "user",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
