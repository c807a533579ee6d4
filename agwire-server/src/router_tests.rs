//! Tests for the router builder.

use std::sync::Arc;

use agwire_core::{ContentNegotiator, Event, PoolManager};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::error::BuildError;
use crate::router::AgwireRouter;
use crate::sse::{EventSource, ReplaySource};

fn source() -> ReplaySource {
    ReplaySource::new(vec![
        Event::run_started("t", "r"),
        Event::run_finished("t", "r"),
    ])
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from("{}"))
        .unwrap()
}

#[test]
fn test_build_without_endpoints_fails() {
    let result = AgwireRouter::new(source()).build();
    assert!(matches!(result, Err(BuildError::NoEndpoints)));

    let result = AgwireRouter::new(source()).build_nested("/agent");
    assert!(matches!(result, Err(BuildError::NoEndpoints)));
}

#[test]
fn test_either_endpoint_is_enough() {
    assert!(AgwireRouter::new(source()).with_stream("/s").build().is_ok());
    assert!(AgwireRouter::new(source())
        .with_legacy_stream("/l")
        .build()
        .is_ok());
}

#[test]
fn test_from_arc_shares_source() {
    let shared: Arc<dyn EventSource> = Arc::new(source());
    let app = AgwireRouter::from_arc(Arc::clone(&shared))
        .with_stream("/s")
        .build();

    assert!(app.is_ok());
    assert!(Arc::strong_count(&shared) >= 2);
}

#[tokio::test]
async fn test_routes_are_mounted() {
    let app = AgwireRouter::new(source())
        .with_stream("/stream")
        .with_legacy_stream("/legacy")
        .build()
        .unwrap();

    let response = app.clone().oneshot(post("/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(post("/legacy")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(post("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_build_nested_prefixes_routes() {
    let app = AgwireRouter::new(source())
        .with_stream("/stream")
        .build_nested("/agent")
        .unwrap();

    let response = app.clone().oneshot(post("/agent/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(post("/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shared_pools_back_the_writer() {
    let pools = Arc::new(PoolManager::default());
    let app = AgwireRouter::new(source())
        .with_stream("/stream")
        .pools(Arc::clone(&pools))
        .negotiator(Arc::new(ContentNegotiator::default()))
        .build()
        .unwrap();

    let response = app.oneshot(post("/stream")).await.unwrap();
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let allocated: u64 = pools.stats().buffers.iter().map(|t| t.allocated).sum();
    assert!(allocated > 0);
}
