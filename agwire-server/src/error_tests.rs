//! Tests for error handling and IntoResponse implementation.

use crate::error::*;
use agwire_core::NegotiationError;
use axum::{http::StatusCode, response::IntoResponse};

async fn body_json(error: ServerError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    (parts.status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_not_acceptable_is_406() {
    let (status, body) = body_json(ServerError::NotAcceptable("text/html".to_string())).await;

    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["error"], "text/html");
    assert_eq!(body["code"], 406);
}

#[tokio::test]
async fn test_invalid_request_is_400() {
    let (status, body) = body_json(ServerError::InvalidRequest("Bad input".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad input");
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_source_and_internal_are_500() {
    for error in [
        ServerError::Source("model offline".to_string()),
        ServerError::Internal("Something went wrong".to_string()),
    ] {
        let (status, body) = body_json(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 500);
    }
}

#[tokio::test]
async fn test_message_with_quotes_is_escaped() {
    let message = r#"Field "name" has invalid value "test""#;
    let (_, body) = body_json(ServerError::InvalidRequest(message.to_string())).await;

    assert_eq!(body["error"], message);
}

#[test]
fn test_server_error_display() {
    let cases = [
        (
            ServerError::NotAcceptable("no format".to_string()),
            "Not acceptable: no format",
        ),
        (
            ServerError::InvalidRequest("bad".to_string()),
            "Invalid request: bad",
        ),
        (
            ServerError::Source("gone".to_string()),
            "Event source error: gone",
        ),
        (
            ServerError::Internal("oops".to_string()),
            "Internal error: oops",
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(error.to_string(), expected);
    }
}

#[test]
fn test_from_negotiation_error() {
    let error: ServerError = NegotiationError::NoAcceptableType.into();
    assert_eq!(error.status(), StatusCode::NOT_ACCEPTABLE);

    let error: ServerError = NegotiationError::InvalidAcceptHeader("q=2".to_string()).into();
    assert_eq!(error.status(), StatusCode::NOT_ACCEPTABLE);

    // A server without formats is misconfigured, not a client problem.
    let error: ServerError = NegotiationError::NoSupportedTypes.into();
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_build_error_display() {
    assert!(BuildError::NoEndpoints
        .to_string()
        .starts_with("No endpoints configured"));
}

#[test]
fn test_error_types_are_send_sync() {
    fn is_send<T: Send>() {}
    fn is_sync<T: Sync>() {}

    is_send::<ServerError>();
    is_sync::<ServerError>();
}
