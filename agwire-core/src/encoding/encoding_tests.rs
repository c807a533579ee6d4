use super::*;
use std::io::{self, Write};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing_test::traced_test;

use crate::event::{Event, EventKind, Message, Role};
use crate::negotiation::ContentNegotiator;
use crate::pool::PoolManager;

/// Sink that records bytes and can be told to fail.
#[derive(Default)]
struct TestSink {
    written: Vec<u8>,
    flushes: usize,
    fail_write: bool,
    fail_flush: bool,
}

impl Write for TestSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        if self.fail_flush {
            return Err(io::Error::new(io::ErrorKind::Other, "flush refused"));
        }
        Ok(())
    }
}

impl TestSink {
    fn text(&self) -> &str {
        std::str::from_utf8(&self.written).unwrap()
    }
}

struct FailingCodec;

impl FrameCodec for FailingCodec {
    fn content_types(&self) -> &[&'static str] {
        &[formats::PROTOBUF]
    }

    fn encode_into(&self, _event: &Event, _buf: &mut BytesMut) -> Result<(), FrameError> {
        Err(FrameError::Encode(<serde_json::Error as serde::ser::Error>::custom(
            "unsupported value",
        )))
    }
}

fn writer() -> SseWriter {
    SseWriter::new(Arc::new(PoolManager::default()))
}

fn data_line(frame: &str) -> &str {
    frame
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap()
}

#[test]
fn test_frame_layout_with_timestamp() {
    let mut sink = TestSink::default();
    let event = Event::text_message_content("msg-1", "Hello").with_timestamp(1700000000000);

    writer().write_event(&mut sink, &event).unwrap();

    assert_eq!(
        sink.text(),
        "id: TEXT_MESSAGE_CONTENT_1700000000000\n\
         data: {\"type\":\"TEXT_MESSAGE_CONTENT\",\"messageId\":\"msg-1\",\"delta\":\"Hello\",\"timestamp\":1700000000000}\n\n"
    );
    assert_eq!(sink.flushes, 1);
}

#[test]
fn test_untimed_event_has_no_id_line() {
    let mut sink = TestSink::default();
    let event = Event::untimed(EventKind::StepStarted {
        step_name: "plan".to_string(),
    });

    writer().write_event(&mut sink, &event).unwrap();

    assert_eq!(
        sink.text(),
        "data: {\"type\":\"STEP_STARTED\",\"stepName\":\"plan\"}\n\n"
    );
}

#[test]
fn test_label_line_precedes_id() {
    let mut sink = TestSink::default();
    let event = Event::run_started("t", "r").with_timestamp(5);

    writer()
        .write_event_with_type(&mut sink, &event, "run")
        .unwrap();

    let lines: Vec<&str> = sink.text().split('\n').collect();
    assert_eq!(lines[0], "event: run");
    assert_eq!(lines[1], "id: RUN_STARTED_5");
    assert!(lines[2].starts_with("data: "));
    assert_eq!(&lines[3..], &["", ""]);
}

#[test]
fn test_empty_label_is_omitted() {
    let mut sink = TestSink::default();
    writer()
        .write_event_with_type(&mut sink, &Event::run_error("x"), "")
        .unwrap();
    assert!(!sink.text().contains("event:"));
}

#[test]
fn test_raw_newlines_are_escaped() {
    let mut sink = TestSink::default();
    writer()
        .write_bytes(&mut sink, b"{\"a\":\"line1\nline2\r\"}")
        .unwrap();

    assert_eq!(sink.text(), "data: {\"a\":\"line1\\nline2\\r\"}\n\n");
    assert_eq!(sink.text().matches('\n').count(), 2);
}

#[test]
fn test_data_line_round_trips_to_equal_event() {
    let patch: json_patch::Patch =
        serde_json::from_value(json!([{"op": "replace", "path": "/n", "value": 2}])).unwrap();
    let events = vec![
        Event::text_message_content("m", "multi\nline\r\ntext"),
        Event::state_delta(patch),
        Event::messages_snapshot(vec![Message::text("m", Role::Assistant, "a\nb")]),
        Event::custom("note", Some(json!({"text": "x\ny"}))),
    ];

    let writer = writer();
    for event in events {
        let mut sink = TestSink::default();
        writer.write_event(&mut sink, &event).unwrap();

        let decoded: Event = serde_json::from_str(data_line(sink.text())).unwrap();
        assert_eq!(decoded, event);
    }
}

#[test]
fn test_error_event_frame() {
    let mut sink = TestSink::default();
    let err = io::Error::new(io::ErrorKind::Other, "upstream timed out");

    writer()
        .write_error_event(&mut sink, &err, "req-42")
        .unwrap();

    let text = sink.text();
    assert!(text.starts_with("event: error\nid: CUSTOM_"));

    let payload: Value = serde_json::from_str(data_line(text)).unwrap();
    assert_eq!(payload["type"], "CUSTOM");
    assert_eq!(payload["name"], "error");
    assert_eq!(
        payload["value"],
        json!({"error": true, "message": "upstream timed out", "request_id": "req-42"})
    );
}

#[test]
#[traced_test]
fn test_write_failure_is_distinct_and_skips_flush() {
    let mut sink = TestSink {
        fail_write: true,
        ..TestSink::default()
    };

    let err = writer()
        .write_event(&mut sink, &Event::run_started("t", "r"))
        .unwrap_err();

    assert!(matches!(err, FrameError::Write(_)));
    assert!(err.to_string().starts_with("SSE write failed"));
    assert!(err.is_transport());
    assert_eq!(sink.flushes, 0);
    assert!(logs_contain("failed to write SSE frame"));
}

#[test]
#[traced_test]
fn test_flush_failure_is_distinct() {
    let mut sink = TestSink {
        fail_flush: true,
        ..TestSink::default()
    };

    let err = writer()
        .write_event(&mut sink, &Event::run_started("t", "r"))
        .unwrap_err();

    assert!(matches!(err, FrameError::Flush(_)));
    assert!(err.to_string().starts_with("SSE flush failed"));
    // The frame was written in full before the flush failed.
    assert!(sink.text().ends_with("\n\n"));
    assert!(logs_contain("failed to flush SSE frame"));
}

#[test]
fn test_encoding_failure_writes_nothing() {
    let negotiator = Arc::new(ContentNegotiator::new(formats::JSON));
    let mut writer = writer().with_negotiator(negotiator);
    writer.register_codec(Arc::new(FailingCodec));

    let mut sink = TestSink::default();
    let err = writer
        .write_event_with_negotiation(&mut sink, &Event::run_error("x"), formats::PROTOBUF)
        .unwrap_err();

    assert!(matches!(err, FrameError::Encode(_)));
    assert!(err.to_string().starts_with("event encoding failed"));
    assert!(sink.written.is_empty());
    assert_eq!(sink.flushes, 0);
}

#[test]
#[traced_test]
fn test_negotiation_falls_back_to_json() {
    let writer = writer();

    // Protobuf negotiates but has no codec.
    let mut sink = TestSink::default();
    let used = writer
        .write_event_with_negotiation(&mut sink, &Event::run_error("x"), formats::PROTOBUF)
        .unwrap();
    assert_eq!(used, formats::JSON);
    assert!(logs_contain("no codec for negotiated format"));

    let mut sink = TestSink::default();
    let used = writer
        .write_event_with_negotiation(&mut sink, &Event::run_error("x"), "image/png")
        .unwrap();
    assert_eq!(used, formats::JSON);
    assert!(logs_contain("content negotiation failed"));
}

#[test]
fn test_negotiation_uses_agui_codec() {
    let mut sink = TestSink::default();
    let used = writer()
        .write_event_with_negotiation(&mut sink, &Event::run_error("x"), formats::AGUI_JSON)
        .unwrap();
    assert_eq!(used, formats::AGUI_JSON);
    assert!(writer().codec_for("Application/JSON").is_some());
}

#[test]
fn test_select_codec_then_write_with_it() {
    let writer = writer();
    let (content_type, codec) = writer.select_codec("application/vnd.ag-ui+json");
    assert_eq!(content_type, formats::AGUI_JSON);

    let mut sink = TestSink::default();
    writer
        .write_event_with_codec(&mut sink, &Event::step_started("plan"), codec.as_ref())
        .unwrap();
    assert!(data_line(sink.text()).contains("\"STEP_STARTED\""));
    assert_eq!(sink.flushes, 1);
}

#[test]
#[traced_test]
fn test_resolve_codec_skips_negotiation() {
    let writer = writer();

    let (content_type, _) = writer.resolve_codec("Application/VND.AG-UI+JSON");
    assert_eq!(content_type, formats::AGUI_JSON);

    let (content_type, _) = writer.resolve_codec(formats::PROTOBUF);
    assert_eq!(content_type, formats::JSON);
    assert!(logs_contain("no codec for negotiated format"));
}

#[test]
fn test_scratch_buffers_return_to_pool() {
    let pools = Arc::new(PoolManager::default());
    let writer = SseWriter::new(Arc::clone(&pools));

    for _ in 0..10 {
        let mut sink = TestSink::default();
        writer
            .write_event(&mut sink, &Event::text_message_content("m", "hi"))
            .unwrap();
    }

    let stats = pools.stats();
    let live: usize = stats.buffers.iter().map(|s| s.live).sum();
    let idle: usize = stats.buffers.iter().map(|s| s.idle).sum();
    assert_eq!(live, idle);
    assert!(live <= 2);
}

#[test]
fn test_size_hints() {
    assert_eq!(Event::run_started("t", "r").size_hint(), SMALL_EVENT_SIZE);
    assert_eq!(Event::text_message_content("m", "x").size_hint(), MEDIUM_EVENT_SIZE);
    assert_eq!(
        Event::text_message_content("m", "x".repeat(5000)).size_hint(),
        10_000
    );
    assert_eq!(Event::tool_call_args("tc", "{}").size_hint(), LARGE_EVENT_SIZE);
    assert_eq!(Event::state_snapshot(json!({})).size_hint(), VERY_LARGE_EVENT_SIZE);

    let messages = (0..40)
        .map(|i| Message::text(format!("m{i}"), Role::User, "hi"))
        .collect();
    assert_eq!(Event::messages_snapshot(messages).size_hint(), 20_000);

    assert_eq!(batch_size_hint(&[]), DEFAULT_EVENT_SIZE);
    assert_eq!(
        batch_size_hint(&[Event::step_started("a"), Event::step_finished("a")]),
        2 * (SMALL_EVENT_SIZE + 50)
    );
}
