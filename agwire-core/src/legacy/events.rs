use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Role;

/// Events in the legacy (pre-AG-UI) vocabulary.
///
/// Serialized with a PascalCase `type` tag and camelCase fields. Tool calls
/// appear as action executions, and state changes as `AgentStateMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum LegacyEvent {
    RunStarted {
        thread_id: String,
        run_id: String,
    },

    RunFinished {
        thread_id: String,
        run_id: String,
    },

    RunError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    TextMessageStart {
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
        role: Role,
    },

    TextMessageContent {
        message_id: String,
        content: String,
    },

    TextMessageEnd {
        message_id: String,
    },

    ActionExecutionStart {
        action_execution_id: String,
        action_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },

    ActionExecutionArgs {
        action_execution_id: String,
        args: String,
    },

    ActionExecutionEnd {
        action_execution_id: String,
    },

    /// Step activity toggles and derived state updates.
    ///
    /// `state` holds the aggregate state serialized as a JSON string.
    AgentStateMessage {
        thread_id: String,
        agent_name: String,
        node_name: String,
        run_id: String,
        active: bool,
        role: Role,
        state: String,
        running: bool,
    },

    MetaEvent {
        name: String,
        #[serde(default)]
        value: Value,
    },
}

impl LegacyEvent {
    /// The wire `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            LegacyEvent::RunStarted { .. } => "RunStarted",
            LegacyEvent::RunFinished { .. } => "RunFinished",
            LegacyEvent::RunError { .. } => "RunError",
            LegacyEvent::TextMessageStart { .. } => "TextMessageStart",
            LegacyEvent::TextMessageContent { .. } => "TextMessageContent",
            LegacyEvent::TextMessageEnd { .. } => "TextMessageEnd",
            LegacyEvent::ActionExecutionStart { .. } => "ActionExecutionStart",
            LegacyEvent::ActionExecutionArgs { .. } => "ActionExecutionArgs",
            LegacyEvent::ActionExecutionEnd { .. } => "ActionExecutionEnd",
            LegacyEvent::AgentStateMessage { .. } => "AgentStateMessage",
            LegacyEvent::MetaEvent { .. } => "MetaEvent",
        }
    }

    /// Parsed `state` of an `AgentStateMessage`.
    pub fn agent_state(&self) -> Option<Value> {
        match self {
            LegacyEvent::AgentStateMessage { state, .. } => serde_json::from_str(state).ok(),
            _ => None,
        }
    }
}
