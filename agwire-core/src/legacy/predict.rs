//! Predictive state mappings: projecting streamed tool arguments into state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the `CUSTOM` event that registers mappings.
pub const PREDICT_STATE_EVENT: &str = "PredictState";

/// Maps a tool's argument into a top-level key of the agent state.
///
/// With no `tool_argument`, the whole argument object is projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictStateMapping {
    pub state_key: String,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_argument: Option<String>,
}

impl PredictStateMapping {
    /// Map a whole tool argument object to `state_key`.
    pub fn new(state_key: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            state_key: state_key.into(),
            tool: tool.into(),
            tool_argument: None,
        }
    }

    /// Map only one argument of the tool call.
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.tool_argument = Some(argument.into());
        self
    }

    /// The value this mapping projects from a complete argument object, if present.
    pub fn project(&self, args: &Map<String, Value>) -> Option<Value> {
        match &self.tool_argument {
            Some(name) => args.get(name).cloned(),
            None => Some(Value::Object(args.clone())),
        }
    }
}

/// Parse a `PredictState` payload: a single mapping or a list of them.
pub fn parse_mappings(value: &Value) -> Result<Vec<PredictStateMapping>, serde_json::Error> {
    match value {
        Value::Array(_) => serde_json::from_value(value.clone()),
        _ => serde_json::from_value(value.clone()).map(|m| vec![m]),
    }
}

/// Parse accumulated argument text.
///
/// Returns `None` while the text is not yet a complete JSON object.
pub fn parse_complete_args(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
