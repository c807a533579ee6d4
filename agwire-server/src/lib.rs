//! HTTP endpoints that stream AG-UI runs as Server-Sent Events.
//!
//! Plug an [`EventSource`] into an [`AgwireRouter`] and serve the result with
//! axum. Each request gets its payload format negotiated from `Accept`, and
//! every event is framed by the shared [`agwire_core::SseWriter`]. A second,
//! optional endpoint translates the run into the legacy event vocabulary.
//!
//! # Example
//!
//! ```rust,no_run
//! use agwire_core::Event;
//! use agwire_server::{AgwireRouter, ReplaySource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ReplaySource::new(vec![
//!     Event::run_started("thread-1", "run-1"),
//!     Event::run_finished("thread-1", "run-1"),
//! ]);
//!
//! let app = AgwireRouter::new(source)
//!     .with_stream("/api/agent")
//!     .with_legacy_stream("/api/agent/legacy")
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod router;
pub mod sse;
pub(crate) mod state;

pub use error::{BuildError, ServerError, ServerResult};
pub use router::AgwireRouter;
pub use sse::{EventSource, EventStream, ReplaySource, RunRequest};
