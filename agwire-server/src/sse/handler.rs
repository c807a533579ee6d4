//! HTTP handlers for the SSE endpoints.

use std::convert::Infallible;

use agwire_core::{formats, FrameError, LegacyConverter};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue},
    response::Response,
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::source::RunRequest;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Header carrying the id reported in error frames. Echoed on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Frames in flight between the run task and the response body. A slow
/// client stalls the run task after one frame.
const CHANNEL_CAPACITY: usize = 1;

/// Stream a run as AG-UI events.
///
/// The payload format is negotiated from `Accept` once, before the run starts;
/// a client that accepts none of the registered formats gets `406`. An event
/// that fails to encode is replaced by an error frame and the stream goes on.
pub async fn stream_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(mut request) = body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    let accept = payload_accept(&headers);
    let negotiated = state.writer.negotiator().negotiate(&accept)?;
    let (content_type, codec) = state.writer.resolve_codec(&negotiated);

    let request_id = request_id(&headers);
    let (thread_id, run_id) = fill_run_ids(&mut request);
    debug!(
        request_id = %request_id,
        thread_id = %thread_id,
        run_id = %run_id,
        negotiated = %negotiated,
        content_type,
        "starting event stream"
    );

    let mut events = state.source.run(request).await?;
    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
    let writer = state.writer.clone();
    let task_request_id = request_id.clone();

    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let mut frame = Vec::new();
            if let Err(err) = writer.write_event_with_codec(&mut frame, &event, codec.as_ref()) {
                warn!(
                    error = %err,
                    event_type = %event.event_type(),
                    request_id = %task_request_id,
                    "replacing event with error frame"
                );
                frame.clear();
                if let Err(err) = writer.write_error_event(&mut frame, &err, &task_request_id) {
                    warn!(
                        error = %err,
                        request_id = %task_request_id,
                        "failed to write error frame, ending stream"
                    );
                    break;
                }
            }
            if tx.send(Bytes::from(frame)).await.is_err() {
                debug!(request_id = %task_request_id, "client disconnected");
                break;
            }
        }
    });

    Ok(sse_response(rx, &request_id))
}

/// Stream a run translated into the legacy event vocabulary.
///
/// Each request gets its own converter, seeded from the router's converter
/// config with the request's thread and run ids.
pub async fn legacy_stream_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(mut request) = body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    let request_id = request_id(&headers);
    let (thread_id, run_id) = fill_run_ids(&mut request);
    let mut config = state.converter.clone();
    config.thread_id = thread_id;
    config.run_id = run_id;
    debug!(
        request_id = %request_id,
        thread_id = %config.thread_id,
        run_id = %config.run_id,
        "starting legacy event stream"
    );

    let mut events = state.source.run(request).await?;
    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
    let writer = state.writer.clone();
    let task_request_id = request_id.clone();

    tokio::spawn(async move {
        let mut converter = LegacyConverter::new(config);

        while let Some(event) = events.next().await {
            let mut frame = Vec::new();
            let mut aborted = false;
            for legacy in converter.convert(&event) {
                let written = serde_json::to_vec(&legacy)
                    .map_err(FrameError::Encode)
                    .and_then(|payload| writer.write_bytes(&mut frame, &payload));
                if let Err(err) = written {
                    warn!(
                        error = %err,
                        legacy_type = legacy.type_name(),
                        request_id = %task_request_id,
                        "replacing legacy event with error frame"
                    );
                    if let Err(err) = writer.write_error_event(&mut frame, &err, &task_request_id)
                    {
                        warn!(
                            error = %err,
                            request_id = %task_request_id,
                            "failed to write error frame, ending legacy stream"
                        );
                        aborted = true;
                        break;
                    }
                }
            }
            if aborted {
                break;
            }
            if frame.is_empty() {
                continue;
            }
            if tx.send(Bytes::from(frame)).await.is_err() {
                debug!(request_id = %task_request_id, "client disconnected");
                break;
            }
        }

        let anomalies = converter.anomalies();
        if !anomalies.is_empty() {
            warn!(
                request_id = %task_request_id,
                count = anomalies.len(),
                "legacy conversion finished with anomalies"
            );
        }
    });

    Ok(sse_response(rx, &request_id))
}

/// The client's `Accept` ranges minus `text/event-stream`.
///
/// `text/event-stream` names the transport, not the payload, so it takes no
/// part in payload negotiation. Returns an empty string when nothing is left.
pub(crate) fn payload_accept(headers: &HeaderMap) -> String {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|range| {
            let media = range.split(';').next().unwrap_or_default().trim();
            !media.is_empty() && !media.eq_ignore_ascii_case(formats::EVENT_STREAM)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// The caller's `x-request-id`, or a fresh UUID.
pub(crate) fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Generate any missing thread or run id and return both.
fn fill_run_ids(request: &mut RunRequest) -> (String, String) {
    let thread_id = request
        .thread_id
        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
        .clone();
    let run_id = request
        .run_id
        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
        .clone();
    (thread_id, run_id)
}

fn sse_response(rx: mpsc::Receiver<Bytes>, request_id: &str) -> Response {
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    let mut response = Response::new(body);

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(formats::EVENT_STREAM),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
