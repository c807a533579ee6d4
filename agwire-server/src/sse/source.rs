use agwire_core::{Event, Message};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServerResult;

/// Events of one run, in emission order.
pub type EventStream = BoxStream<'static, Event>;

/// Request body for starting a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Thread ID for conversation continuity. Generated when absent.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Run ID for this specific run. Generated when absent.
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Client-side agent state at the start of the run.
    #[serde(default)]
    pub state: Value,
}

/// Produces the events of a run.
///
/// Handlers call [`run`](Self::run) once per request, after filling in any
/// missing thread or run id, then drain the returned stream into the
/// response body. The stream ends when the run is over.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    async fn run(&self, request: RunRequest) -> ServerResult<EventStream>;
}

/// Replays a fixed list of events for every request.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    events: Vec<Event>,
}

impl ReplaySource {
    /// Create a source that replays `events`.
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// The events replayed for each request.
    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

#[async_trait]
impl EventSource for ReplaySource {
    async fn run(&self, _request: RunRequest) -> ServerResult<EventStream> {
        Ok(stream::iter(self.events.clone()).boxed())
    }
}
