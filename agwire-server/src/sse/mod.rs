//! SSE endpoints and the event source they stream from.

pub(crate) mod handler;
mod source;

pub use handler::REQUEST_ID_HEADER;
pub use source::{EventSource, EventStream, ReplaySource, RunRequest};
