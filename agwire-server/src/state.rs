//! Application state for the agwire server.

use std::sync::Arc;

use agwire_core::{ConverterConfig, SseWriter};

use crate::sse::EventSource;

/// Shared state cloned into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn EventSource>,
    /// Frames events; owns the negotiator and pool manager.
    pub writer: Arc<SseWriter>,
    /// Template for per-request legacy converters. Thread and run ids are
    /// filled in from each request.
    pub converter: ConverterConfig,
}
