//! Serialized-size estimates used to pick a scratch buffer tier.

use crate::event::{Event, EventKind, EventType};

/// Run/step/message boundaries and other metadata-only events.
pub const SMALL_EVENT_SIZE: usize = 512;
/// Text content, deltas, custom payloads.
pub const MEDIUM_EVENT_SIZE: usize = 2048;
/// Tool arguments and raw passthrough.
pub const LARGE_EVENT_SIZE: usize = 8192;
/// Whole-state and whole-history snapshots.
pub const VERY_LARGE_EVENT_SIZE: usize = 16384;
pub const DEFAULT_EVENT_SIZE: usize = 1024;

const PATCH_OPERATION_SIZE: usize = 100;
const SNAPSHOT_MESSAGE_SIZE: usize = 500;
const BATCH_ENTRY_OVERHEAD: usize = 50;

/// Base estimate for an event type.
pub fn base_size(event_type: EventType) -> usize {
    match event_type {
        EventType::RunStarted
        | EventType::RunFinished
        | EventType::StepStarted
        | EventType::StepFinished
        | EventType::TextMessageStart
        | EventType::TextMessageEnd
        | EventType::ToolCallStart
        | EventType::ToolCallEnd => SMALL_EVENT_SIZE,
        EventType::TextMessageContent
        | EventType::StateDelta
        | EventType::Custom
        | EventType::RunError => MEDIUM_EVENT_SIZE,
        EventType::ToolCallArgs | EventType::Raw => LARGE_EVENT_SIZE,
        EventType::StateSnapshot | EventType::MessagesSnapshot => VERY_LARGE_EVENT_SIZE,
    }
}

impl Event {
    /// Estimated serialized size in bytes.
    ///
    /// Scales with delta length, patch operation count and message count
    /// where the payload makes that cheap to know.
    pub fn size_hint(&self) -> usize {
        let base = base_size(self.event_type());
        match self.kind() {
            EventKind::TextMessageContent { delta, .. } | EventKind::ToolCallArgs { delta, .. } => {
                base.max(delta.len() * 2)
            }
            EventKind::StateDelta { delta } => base.max(delta.0.len() * PATCH_OPERATION_SIZE),
            EventKind::MessagesSnapshot { messages } => {
                base.max(messages.len() * SNAPSHOT_MESSAGE_SIZE)
            }
            _ => base,
        }
    }
}

/// Estimated size of a JSON array holding `events`.
pub fn batch_size_hint(events: &[Event]) -> usize {
    if events.is_empty() {
        return DEFAULT_EVENT_SIZE;
    }
    events
        .iter()
        .map(|e| e.size_hint() + BATCH_ENTRY_OVERHEAD)
        .sum()
}
