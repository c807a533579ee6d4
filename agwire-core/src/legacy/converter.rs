use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::events::LegacyEvent;
use super::predict::{
    parse_complete_args, parse_mappings, PredictStateMapping, PREDICT_STATE_EVENT,
};
use crate::event::{Event, EventKind, Role};

/// What to do with events that do not fit the current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyPolicy {
    /// Drop the event and log at debug level.
    #[default]
    Ignore,
    /// Drop the event, log at warn level and keep a [`ConversionAnomaly`].
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    UnknownMessage,
    DuplicateMessage,
    UnknownToolCall,
    DuplicateToolCall,
    InactiveStep,
    DuplicateStep,
    InvalidPatch,
    InvalidPredictState,
}

/// An event that was dropped because it did not match the open ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionAnomaly {
    pub kind: AnomalyKind,
    /// Message, tool-call or step id the event referred to.
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub thread_id: String,
    pub run_id: String,
    pub agent_name: String,
    pub anomaly_policy: AnomalyPolicy,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            thread_id: String::new(),
            run_id: String::new(),
            agent_name: "agent".to_string(),
            anomaly_policy: AnomalyPolicy::Ignore,
        }
    }
}

impl ConverterConfig {
    /// Create a config for one run with the default agent name.
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    /// Set the agent name reported in state messages.
    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = agent_name.into();
        self
    }

    /// Set how misplaced events are handled.
    pub fn with_anomaly_policy(mut self, policy: AnomalyPolicy) -> Self {
        self.anomaly_policy = policy;
        self
    }
}

#[derive(Debug, Clone)]
struct OpenToolCall {
    name: String,
    args: String,
}

/// Per-run translator from AG-UI events to the legacy vocabulary.
///
/// Messages and tool calls are tracked by id, so streams may interleave and
/// close in any order. Events that reference ids in the wrong state are
/// dropped without disturbing other open ids.
#[derive(Debug)]
pub struct LegacyConverter {
    config: ConverterConfig,
    messages: HashMap<String, String>,
    tool_calls: HashMap<String, OpenToolCall>,
    /// Active steps in start order.
    steps: Vec<String>,
    state: Value,
    mappings: Vec<PredictStateMapping>,
    anomalies: Vec<ConversionAnomaly>,
}

impl LegacyConverter {
    /// Create a converter for one run.
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            messages: HashMap::new(),
            tool_calls: HashMap::new(),
            steps: Vec::new(),
            state: Value::Object(Map::new()),
            mappings: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// The run's configuration, including adopted thread and run ids.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Translate one event. Never fails; misplaced events produce no output.
    pub fn convert(&mut self, event: &Event) -> Vec<LegacyEvent> {
        match event.kind() {
            EventKind::RunStarted {
                thread_id, run_id, ..
            } => {
                self.config.thread_id = thread_id.clone();
                self.config.run_id = run_id.clone();
                vec![LegacyEvent::RunStarted {
                    thread_id: thread_id.clone(),
                    run_id: run_id.clone(),
                }]
            }
            EventKind::RunFinished {
                thread_id, run_id, ..
            } => {
                self.end_run();
                vec![LegacyEvent::RunFinished {
                    thread_id: thread_id.clone(),
                    run_id: run_id.clone(),
                }]
            }
            EventKind::RunError { message, code, .. } => {
                self.end_run();
                vec![LegacyEvent::RunError {
                    message: message.clone(),
                    code: code.clone(),
                }]
            }

            EventKind::StepStarted { step_name } => {
                if self.steps.contains(step_name) {
                    self.anomaly(AnomalyKind::DuplicateStep, step_name);
                    return Vec::new();
                }
                self.steps.push(step_name.clone());
                vec![self.state_message(step_name, true)]
            }
            EventKind::StepFinished { step_name } => {
                let Some(pos) = self.steps.iter().position(|s| s == step_name) else {
                    self.anomaly(AnomalyKind::InactiveStep, step_name);
                    return Vec::new();
                };
                self.steps.remove(pos);
                vec![self.state_message(step_name, false)]
            }

            EventKind::TextMessageStart { message_id, role } => {
                if self.messages.contains_key(message_id) {
                    self.anomaly(AnomalyKind::DuplicateMessage, message_id);
                    return Vec::new();
                }
                self.messages.insert(message_id.clone(), String::new());
                vec![LegacyEvent::TextMessageStart {
                    message_id: message_id.clone(),
                    parent_message_id: None,
                    role: *role,
                }]
            }
            EventKind::TextMessageContent { message_id, delta } => {
                let Some(text) = self.messages.get_mut(message_id) else {
                    self.anomaly(AnomalyKind::UnknownMessage, message_id);
                    return Vec::new();
                };
                text.push_str(delta);
                vec![LegacyEvent::TextMessageContent {
                    message_id: message_id.clone(),
                    content: delta.clone(),
                }]
            }
            EventKind::TextMessageEnd { message_id } => {
                if self.messages.remove(message_id).is_none() {
                    self.anomaly(AnomalyKind::UnknownMessage, message_id);
                    return Vec::new();
                }
                vec![LegacyEvent::TextMessageEnd {
                    message_id: message_id.clone(),
                }]
            }

            EventKind::ToolCallStart {
                tool_call_id,
                tool_call_name,
                parent_message_id,
            } => {
                if self.tool_calls.contains_key(tool_call_id) {
                    self.anomaly(AnomalyKind::DuplicateToolCall, tool_call_id);
                    return Vec::new();
                }
                self.tool_calls.insert(
                    tool_call_id.clone(),
                    OpenToolCall {
                        name: tool_call_name.clone(),
                        args: String::new(),
                    },
                );
                vec![LegacyEvent::ActionExecutionStart {
                    action_execution_id: tool_call_id.clone(),
                    action_name: tool_call_name.clone(),
                    parent_message_id: parent_message_id.clone(),
                }]
            }
            EventKind::ToolCallArgs {
                tool_call_id,
                delta,
            } => self.tool_call_args(tool_call_id, delta),
            EventKind::ToolCallEnd { tool_call_id } => {
                if self.tool_calls.remove(tool_call_id).is_none() {
                    self.anomaly(AnomalyKind::UnknownToolCall, tool_call_id);
                    return Vec::new();
                }
                vec![LegacyEvent::ActionExecutionEnd {
                    action_execution_id: tool_call_id.clone(),
                }]
            }

            EventKind::StateSnapshot { snapshot } => {
                let previous = std::mem::replace(&mut self.state, snapshot.clone());
                self.emit_if_mapped_changed(&previous)
            }
            EventKind::StateDelta { delta } => {
                let mut next = self.state.clone();
                if let Err(err) = json_patch::patch(&mut next, delta) {
                    debug!(error = %err, "state delta did not apply");
                    self.anomaly(AnomalyKind::InvalidPatch, "state");
                    return Vec::new();
                }
                let previous = std::mem::replace(&mut self.state, next);
                self.emit_if_mapped_changed(&previous)
            }

            EventKind::Custom { name, value } => {
                if name == PREDICT_STATE_EVENT {
                    self.register_mappings(value.as_ref());
                    return Vec::new();
                }
                vec![LegacyEvent::MetaEvent {
                    name: name.clone(),
                    value: value.clone().unwrap_or(Value::Null),
                }]
            }

            EventKind::MessagesSnapshot { .. } | EventKind::Raw { .. } => Vec::new(),
        }
    }

    /// Translate a batch of events in order.
    pub fn convert_all<'a, I>(&mut self, events: I) -> Vec<LegacyEvent>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        events
            .into_iter()
            .flat_map(|event| self.convert(event))
            .collect()
    }

    /// Register predictive mappings directly, as a `PredictState` event would.
    pub fn add_mapping(&mut self, mapping: PredictStateMapping) {
        self.mappings.push(mapping);
    }

    fn tool_call_args(&mut self, tool_call_id: &str, delta: &str) -> Vec<LegacyEvent> {
        let Some(call) = self.tool_calls.get_mut(tool_call_id) else {
            self.anomaly(AnomalyKind::UnknownToolCall, tool_call_id);
            return Vec::new();
        };
        call.args.push_str(delta);

        let mut out = vec![LegacyEvent::ActionExecutionArgs {
            action_execution_id: tool_call_id.to_string(),
            args: delta.to_string(),
        }];

        let tool = call.name.clone();
        if !self.mappings.iter().any(|m| m.tool == tool) {
            return out;
        }
        // Partial JSON just means more deltas are coming.
        let Some(args) = parse_complete_args(&call.args) else {
            return out;
        };

        if !self.state.is_object() {
            self.state = Value::Object(Map::new());
        }
        let mut changed = false;
        if let Some(state) = self.state.as_object_mut() {
            for mapping in self.mappings.iter().filter(|m| m.tool == tool) {
                let Some(value) = mapping.project(&args) else {
                    continue;
                };
                if state.get(&mapping.state_key) != Some(&value) {
                    state.insert(mapping.state_key.clone(), value);
                    changed = true;
                }
            }
        }

        if changed {
            out.push(self.state_message(&self.current_node(), true));
        }
        out
    }

    fn register_mappings(&mut self, value: Option<&Value>) {
        match value.map(parse_mappings) {
            Some(Ok(mappings)) => {
                debug!(count = mappings.len(), "registered predictive state mappings");
                self.mappings.extend(mappings);
            }
            Some(Err(err)) => {
                debug!(error = %err, "invalid PredictState payload");
                self.anomaly(AnomalyKind::InvalidPredictState, PREDICT_STATE_EVENT);
            }
            None => self.anomaly(AnomalyKind::InvalidPredictState, PREDICT_STATE_EVENT),
        }
    }

    fn emit_if_mapped_changed(&self, previous: &Value) -> Vec<LegacyEvent> {
        let touched = self
            .mappings
            .iter()
            .any(|m| previous.get(&m.state_key) != self.state.get(&m.state_key));
        if touched {
            vec![self.state_message(&self.current_node(), true)]
        } else {
            Vec::new()
        }
    }

    fn state_message(&self, node_name: &str, active: bool) -> LegacyEvent {
        LegacyEvent::AgentStateMessage {
            thread_id: self.config.thread_id.clone(),
            agent_name: self.config.agent_name.clone(),
            node_name: node_name.to_string(),
            run_id: self.config.run_id.clone(),
            active,
            role: Role::Assistant,
            state: self.state.to_string(),
            running: true,
        }
    }

    fn current_node(&self) -> String {
        self.steps.last().cloned().unwrap_or_default()
    }

    fn end_run(&mut self) {
        self.steps.clear();
        self.messages.clear();
        self.tool_calls.clear();
    }

    fn anomaly(&mut self, kind: AnomalyKind, id: &str) {
        match self.config.anomaly_policy {
            AnomalyPolicy::Ignore => {
                debug!(?kind, id, "dropping event that does not match conversion state");
            }
            AnomalyPolicy::Record => {
                warn!(?kind, id, "dropping event that does not match conversion state");
                self.anomalies.push(ConversionAnomaly {
                    kind,
                    id: id.to_string(),
                });
            }
        }
    }

    // ===== Inspection =====

    /// Ids of open text messages, sorted.
    pub fn open_messages(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of open tool calls, sorted.
    pub fn open_tool_calls(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tool_calls.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Active step names in start order.
    pub fn active_steps(&self) -> &[String] {
        &self.steps
    }

    /// Last known aggregate state.
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Predictive state mappings registered so far.
    pub fn mappings(&self) -> &[PredictStateMapping] {
        &self.mappings
    }

    /// Text accumulated so far for an open message.
    pub fn message_text(&self, message_id: &str) -> Option<&str> {
        self.messages.get(message_id).map(String::as_str)
    }

    /// Argument text accumulated so far for an open tool call.
    pub fn tool_args(&self, tool_call_id: &str) -> Option<&str> {
        self.tool_calls.get(tool_call_id).map(|c| c.args.as_str())
    }

    /// Anomalies kept under [`AnomalyPolicy::Record`].
    pub fn anomalies(&self) -> &[ConversionAnomaly] {
        &self.anomalies
    }

    /// Drain the kept anomalies.
    pub fn take_anomalies(&mut self) -> Vec<ConversionAnomaly> {
        std::mem::take(&mut self.anomalies)
    }
}

#[cfg(test)]
#[path = "converter_tests.rs"]
mod tests;
