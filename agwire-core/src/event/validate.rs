use std::collections::HashSet;

use super::kind::{EventKind, EventType, Role};
use super::Event;

/// Errors raised when an event or event sequence breaks protocol rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The `type` discriminator is absent or empty.
    #[error("event validation failed: type field is required")]
    MissingType,

    /// The `type` discriminator names no known event kind.
    #[error("event validation failed: unknown event type '{0}'")]
    UnknownType(String),

    /// A required field is empty.
    #[error("{event} validation failed: {field} field is required")]
    MissingField {
        event: EventType,
        field: &'static str,
    },

    /// A text message event declares a role it may not carry.
    #[error("{event} validation failed: role '{role}' is not allowed on text messages")]
    InvalidRole { event: EventType, role: Role },

    /// The payload could not be decoded into the declared kind.
    #[error("event validation failed: {0}")]
    Malformed(String),

    /// An event arrived out of protocol order.
    #[error("event {index} out of sequence: {reason}")]
    Sequence { index: usize, reason: String },
}

fn require(value: &str, event: EventType, field: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::MissingField { event, field })
    } else {
        Ok(())
    }
}

pub(super) fn validate_kind(kind: &EventKind) -> Result<(), ValidationError> {
    let t = kind.event_type();
    match kind {
        EventKind::RunStarted {
            thread_id, run_id, ..
        }
        | EventKind::RunFinished {
            thread_id, run_id, ..
        } => {
            require(thread_id, t, "threadId")?;
            require(run_id, t, "runId")
        }
        EventKind::RunError { message, .. } => require(message, t, "message"),
        EventKind::StepStarted { step_name } | EventKind::StepFinished { step_name } => {
            require(step_name, t, "stepName")
        }
        EventKind::TextMessageStart { message_id, role } => {
            require(message_id, t, "messageId")?;
            if *role == Role::Tool {
                return Err(ValidationError::InvalidRole {
                    event: t,
                    role: *role,
                });
            }
            Ok(())
        }
        EventKind::TextMessageContent { message_id, delta } => {
            require(message_id, t, "messageId")?;
            require(delta, t, "delta")
        }
        EventKind::TextMessageEnd { message_id } => require(message_id, t, "messageId"),
        EventKind::ToolCallStart {
            tool_call_id,
            tool_call_name,
            ..
        } => {
            require(tool_call_id, t, "toolCallId")?;
            require(tool_call_name, t, "toolCallName")
        }
        EventKind::ToolCallArgs {
            tool_call_id,
            delta,
        } => {
            require(tool_call_id, t, "toolCallId")?;
            require(delta, t, "delta")
        }
        EventKind::ToolCallEnd { tool_call_id } => require(tool_call_id, t, "toolCallId"),
        EventKind::StateSnapshot { .. } => Ok(()),
        EventKind::StateDelta { delta } => {
            if delta.0.is_empty() {
                return Err(ValidationError::MissingField {
                    event: t,
                    field: "delta",
                });
            }
            Ok(())
        }
        EventKind::MessagesSnapshot { messages } => messages
            .iter()
            .try_for_each(|m| require(&m.id, t, "messages[].id")),
        EventKind::Custom { name, .. } => require(name, t, "name"),
        EventKind::Raw { .. } => Ok(()),
    }
}

/// Validate an ordered sequence of events against the protocol's pairing rules.
///
/// Each event is validated individually first. Runs, steps, messages and tool
/// calls must be started before they are continued or finished, and cannot be
/// started twice while open. A finished run cannot be restarted.
pub fn validate_sequence(events: &[Event]) -> Result<(), ValidationError> {
    let mut active_runs = HashSet::new();
    let mut finished_runs = HashSet::new();
    let mut active_steps = HashSet::new();
    let mut active_messages = HashSet::new();
    let mut active_tool_calls = HashSet::new();

    let out_of_order = |index: usize, reason: String| ValidationError::Sequence { index, reason };

    for (index, event) in events.iter().enumerate() {
        event.validate()?;

        match event.kind() {
            EventKind::RunStarted { run_id, .. } => {
                if finished_runs.contains(run_id) {
                    return Err(out_of_order(index, format!("cannot restart finished run {run_id}")));
                }
                if !active_runs.insert(run_id.clone()) {
                    return Err(out_of_order(index, format!("run {run_id} already started")));
                }
            }
            EventKind::RunFinished { run_id, .. } => {
                if !active_runs.remove(run_id) {
                    return Err(out_of_order(
                        index,
                        format!("cannot finish run {run_id} that was not started"),
                    ));
                }
                finished_runs.insert(run_id.clone());
            }
            EventKind::RunError { run_id, .. } => {
                if let Some(run_id) = run_id.as_deref().filter(|id| !id.is_empty()) {
                    if !active_runs.remove(run_id) {
                        return Err(out_of_order(
                            index,
                            format!("cannot error run {run_id} that was not started"),
                        ));
                    }
                    finished_runs.insert(run_id.to_string());
                }
            }
            EventKind::StepStarted { step_name } => {
                if !active_steps.insert(step_name.clone()) {
                    return Err(out_of_order(index, format!("step {step_name} already started")));
                }
            }
            EventKind::StepFinished { step_name } => {
                if !active_steps.remove(step_name) {
                    return Err(out_of_order(
                        index,
                        format!("cannot finish step {step_name} that was not started"),
                    ));
                }
            }
            EventKind::TextMessageStart { message_id, .. } => {
                if !active_messages.insert(message_id.clone()) {
                    return Err(out_of_order(
                        index,
                        format!("message {message_id} already started"),
                    ));
                }
            }
            EventKind::TextMessageContent { message_id, .. } => {
                if !active_messages.contains(message_id) {
                    return Err(out_of_order(
                        index,
                        format!("cannot add content to message {message_id} that was not started"),
                    ));
                }
            }
            EventKind::TextMessageEnd { message_id } => {
                if !active_messages.remove(message_id) {
                    return Err(out_of_order(
                        index,
                        format!("cannot end message {message_id} that was not started"),
                    ));
                }
            }
            EventKind::ToolCallStart { tool_call_id, .. } => {
                if !active_tool_calls.insert(tool_call_id.clone()) {
                    return Err(out_of_order(
                        index,
                        format!("tool call {tool_call_id} already started"),
                    ));
                }
            }
            EventKind::ToolCallArgs { tool_call_id, .. } => {
                if !active_tool_calls.contains(tool_call_id) {
                    return Err(out_of_order(
                        index,
                        format!("cannot add args to tool call {tool_call_id} that was not started"),
                    ));
                }
            }
            EventKind::ToolCallEnd { tool_call_id } => {
                if !active_tool_calls.remove(tool_call_id) {
                    return Err(out_of_order(
                        index,
                        format!("cannot end tool call {tool_call_id} that was not started"),
                    ));
                }
            }
            EventKind::StateSnapshot { .. }
            | EventKind::StateDelta { .. }
            | EventKind::MessagesSnapshot { .. }
            | EventKind::Custom { .. }
            | EventKind::Raw { .. } => {}
        }
    }

    Ok(())
}
