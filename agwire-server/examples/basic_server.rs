//! Basic agwire server replaying a canned run.
//!
//! Run with:
//! ```sh
//! RUST_LOG=agwire_server=debug cargo run -p agwire-server --example basic_server
//! ```
//!
//! Test with curl:
//! ```sh
//! curl -X POST http://localhost:3000/api/agent \
//!   -H "Content-Type: application/json" \
//!   -H "Accept: text/event-stream, application/vnd.ag-ui+json" \
//!   -d '{"threadId": "thread-1"}' \
//!   -N
//! ```

use agwire_core::{ConverterConfig, Event, Role};
use agwire_server::{AgwireRouter, ReplaySource};
use tracing_subscriber::EnvFilter;

fn canned_run() -> Vec<Event> {
    vec![
        Event::run_started("thread-1", "run-1"),
        Event::step_started("answer"),
        Event::text_message_start("msg-1", Role::Assistant),
        Event::text_message_content("msg-1", "Hello from agwire."),
        Event::text_message_end("msg-1"),
        Event::step_finished("answer"),
        Event::run_finished("thread-1", "run-1"),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app = AgwireRouter::new(ReplaySource::new(canned_run()))
        .with_stream("/api/agent")
        .with_legacy_stream("/api/agent/legacy")
        .converter_config(ConverterConfig::default().with_agent_name("greeter"))
        .build()?;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("AG-UI stream: POST http://localhost:3000/api/agent");
    tracing::info!("Legacy stream: POST http://localhost:3000/api/agent/legacy");

    axum::serve(listener, app).await?;

    Ok(())
}
