//! Router builder for agwire HTTP endpoints.

use std::sync::Arc;

use agwire_core::{ContentNegotiator, ConverterConfig, FrameCodec, PoolManager, SseWriter};
use axum::Router;

use crate::error::BuildError;
use crate::sse::EventSource;
use crate::state::AppState;

/// Builder for configuring agwire HTTP endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use agwire_server::{AgwireRouter, ReplaySource};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = AgwireRouter::new(ReplaySource::default())
///     .with_stream("/api/agent")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct AgwireRouter {
    source: Arc<dyn EventSource>,
    stream_path: Option<String>,
    legacy_path: Option<String>,
    negotiator: Option<Arc<ContentNegotiator>>,
    pools: Option<Arc<PoolManager>>,
    codecs: Vec<Arc<dyn FrameCodec>>,
    converter: ConverterConfig,
}

impl AgwireRouter {
    /// Create a new router builder with the given event source.
    pub fn new<S: EventSource>(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }

    /// Create a new router builder from a shared event source.
    pub fn from_arc(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            stream_path: None,
            legacy_path: None,
            negotiator: None,
            pools: None,
            codecs: Vec::new(),
            converter: ConverterConfig::default(),
        }
    }

    /// Serve the AG-UI event stream at `path`.
    pub fn with_stream(mut self, path: impl Into<String>) -> Self {
        self.stream_path = Some(path.into());
        self
    }

    /// Serve the legacy-vocabulary event stream at `path`.
    pub fn with_legacy_stream(mut self, path: impl Into<String>) -> Self {
        self.legacy_path = Some(path.into());
        self
    }

    /// Share a negotiator instead of using one with the default formats.
    ///
    /// Formats registered on it later are picked up by running handlers.
    pub fn negotiator(mut self, negotiator: Arc<ContentNegotiator>) -> Self {
        self.negotiator = Some(negotiator);
        self
    }

    /// Share a pool manager for frame scratch buffers.
    pub fn pools(mut self, pools: Arc<PoolManager>) -> Self {
        self.pools = Some(pools);
        self
    }

    /// Add a payload codec next to the built-in JSON one.
    pub fn codec(mut self, codec: Arc<dyn FrameCodec>) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Template for the per-request legacy converter.
    ///
    /// Its thread and run ids are replaced by each request's.
    pub fn converter_config(mut self, config: ConverterConfig) -> Self {
        self.converter = config;
        self
    }

    /// Build the router with all configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoEndpoints`] if neither endpoint was configured.
    pub fn build(self) -> Result<Router, BuildError> {
        if self.stream_path.is_none() && self.legacy_path.is_none() {
            return Err(BuildError::NoEndpoints);
        }

        let pools = self.pools.unwrap_or_default();
        let mut writer = SseWriter::new(pools);
        if let Some(negotiator) = self.negotiator {
            writer = writer.with_negotiator(negotiator);
        }
        for codec in self.codecs {
            writer.register_codec(codec);
        }

        let state = AppState {
            source: self.source,
            writer: Arc::new(writer),
            converter: self.converter,
        };

        use crate::sse::handler::{legacy_stream_handler, stream_handler};
        use axum::routing::post;

        let mut router = Router::new();
        if let Some(path) = self.stream_path {
            router = router.route(&path, post(stream_handler));
        }
        if let Some(path) = self.legacy_path {
            router = router.route(&path, post(legacy_stream_handler));
        }

        Ok(router.with_state(state))
    }

    /// Build the router and nest it under a prefix path.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoEndpoints`] if no endpoints were configured.
    pub fn build_nested(self, prefix: impl Into<String>) -> Result<Router, BuildError> {
        Ok(Router::new().nest(&prefix.into(), self.build()?))
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
