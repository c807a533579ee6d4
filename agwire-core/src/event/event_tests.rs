//! Tests for the event model's wire contract and validation rules.

use super::*;
use serde_json::json;

#[test]
fn test_wire_discriminators_are_screaming_snake_case() {
    let cases = [
        (Event::run_started("t1", "r1"), "RUN_STARTED"),
        (Event::run_finished("t1", "r1"), "RUN_FINISHED"),
        (Event::run_error("boom"), "RUN_ERROR"),
        (Event::step_started("plan"), "STEP_STARTED"),
        (Event::text_message_start("m1", Role::Assistant), "TEXT_MESSAGE_START"),
        (Event::tool_call_args("tc1", "{}"), "TOOL_CALL_ARGS"),
        (Event::custom("ping", None), "CUSTOM"),
        (Event::raw(json!({"x": 1}), None), "RAW"),
    ];

    for (event, expected) in cases {
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], expected, "wrong type for {:?}", event);
        assert_eq!(event.event_type().as_str(), expected);
    }
}

#[test]
fn test_payload_fields_are_camel_case_and_flat() {
    let event = Event::tool_call_start("tc-1", "search", Some("msg-1".to_string()))
        .with_timestamp(42);
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(
        value,
        json!({
            "type": "TOOL_CALL_START",
            "toolCallId": "tc-1",
            "toolCallName": "search",
            "parentMessageId": "msg-1",
            "timestamp": 42
        })
    );
}

#[test]
fn test_optional_fields_are_omitted() {
    let event = Event::untimed(EventKind::RunError {
        message: "failed".to_string(),
        code: None,
        run_id: None,
    });
    let json = serde_json::to_string(&event).unwrap();
    assert_eq!(json, r#"{"type":"RUN_ERROR","message":"failed"}"#);
}

#[test]
fn test_deserialize_round_trips_every_kind() {
    let patch: json_patch::Patch =
        serde_json::from_value(json!([{"op": "add", "path": "/count", "value": 1}])).unwrap();
    let events = vec![
        Event::run_started("t", "r"),
        Event::run_finished("t", "r"),
        Event::run_error("e"),
        Event::step_started("s"),
        Event::step_finished("s"),
        Event::text_message_start("m", Role::User),
        Event::text_message_content("m", "hello\nworld"),
        Event::text_message_end("m"),
        Event::tool_call_start("tc", "lookup", None),
        Event::tool_call_args("tc", r#"{"q":"rust"}"#),
        Event::tool_call_end("tc"),
        Event::state_snapshot(json!({"count": 0})),
        Event::state_delta(patch),
        Event::messages_snapshot(vec![Message::text("m", Role::User, "hi")]),
        Event::custom("ping", Some(json!({"n": 1}))),
        Event::raw(json!({"upstream": true}), Some("langgraph".to_string())),
    ];

    for event in events {
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

#[test]
fn test_id_uses_type_and_timestamp() {
    let event = Event::custom("x", None).with_timestamp(123456);
    assert_eq!(event.id().as_deref(), Some("CUSTOM_123456"));

    let untimed = Event::untimed(EventKind::TextMessageEnd {
        message_id: "m".to_string(),
    });
    assert!(untimed.id().is_none());
}

#[test]
fn test_new_events_are_timestamped() {
    let before = chrono::Utc::now().timestamp_millis();
    let event = Event::step_started("s");
    let ts = event.timestamp().unwrap();
    assert!(ts >= before);
}

#[test]
fn test_text_message_rejects_tool_role() {
    let event = Event::text_message_start("m1", Role::Tool);
    assert_eq!(
        event.validate(),
        Err(ValidationError::InvalidRole {
            event: EventType::TextMessageStart,
            role: Role::Tool,
        })
    );

    for role in [Role::Developer, Role::System, Role::Assistant, Role::User] {
        assert!(Event::text_message_start("m1", role).validate().is_ok());
    }
}

#[test]
fn test_required_identifiers() {
    let cases = [
        (Event::text_message_start("", Role::Assistant), "messageId"),
        (Event::text_message_content("", "x"), "messageId"),
        (Event::text_message_end(""), "messageId"),
        (Event::tool_call_start("", "t", None), "toolCallId"),
        (Event::tool_call_start("tc", "", None), "toolCallName"),
        (Event::tool_call_args("", "x"), "toolCallId"),
        (Event::tool_call_end(""), "toolCallId"),
        (Event::run_started("", "r"), "threadId"),
        (Event::run_finished("t", ""), "runId"),
        (Event::step_finished(""), "stepName"),
        (Event::custom("", None), "name"),
    ];

    for (event, field) in cases {
        match event.validate() {
            Err(ValidationError::MissingField { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected missing {field} for {:?}, got {:?}", event, other),
        }
    }
}

#[test]
fn test_empty_deltas_rejected() {
    assert!(Event::text_message_content("m", "").validate().is_err());
    assert!(Event::tool_call_args("tc", "").validate().is_err());
    assert!(Event::state_delta(json_patch::Patch(vec![])).validate().is_err());
}

#[test]
fn test_from_json_missing_type() {
    let err = Event::from_json(r#"{"messageId":"m"}"#).unwrap_err();
    assert_eq!(err, ValidationError::MissingType);

    let err = Event::from_json(r#"{"type":"","messageId":"m"}"#).unwrap_err();
    assert_eq!(err, ValidationError::MissingType);
}

#[test]
fn test_from_json_unknown_type() {
    let err = Event::from_json(r#"{"type":"THINKING_START"}"#).unwrap_err();
    assert_eq!(err, ValidationError::UnknownType("THINKING_START".to_string()));
}

#[test]
fn test_from_json_validates_payload() {
    let err = Event::from_json(r#"{"type":"TEXT_MESSAGE_START","messageId":"m","role":"tool"}"#)
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidRole { .. }));

    let err = Event::from_json(r#"{"type":"TOOL_CALL_END"}"#).unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));

    let err = Event::from_json("not json").unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));
}

#[test]
fn test_from_json_accepts_valid_event() {
    let event = Event::from_json(
        r#"{"type":"TEXT_MESSAGE_CONTENT","messageId":"m","delta":"hi","timestamp":7}"#,
    )
    .unwrap();
    assert_eq!(event.timestamp(), Some(7));
    assert!(matches!(
        event.kind(),
        EventKind::TextMessageContent { delta, .. } if delta == "hi"
    ));
}

#[test]
fn test_event_type_parse() {
    for t in EventType::ALL {
        assert_eq!(t.as_str().parse::<EventType>(), Ok(t));
    }
    assert!("run_started".parse::<EventType>().is_err());
}

// ===== Sequence validation =====

#[test]
fn test_sequence_accepts_interleaved_streams() {
    let events = vec![
        Event::run_started("t", "r"),
        Event::text_message_start("m1", Role::Assistant),
        Event::tool_call_start("tc1", "search", Some("m1".to_string())),
        Event::text_message_content("m1", "a"),
        Event::tool_call_args("tc1", "{}"),
        Event::text_message_end("m1"),
        Event::tool_call_end("tc1"),
        Event::run_finished("t", "r"),
    ];
    assert!(validate_sequence(&events).is_ok());
}

#[test]
fn test_sequence_rejects_content_before_start() {
    let events = vec![
        Event::run_started("t", "r"),
        Event::text_message_content("m1", "a"),
    ];
    match validate_sequence(&events) {
        Err(ValidationError::Sequence { index, .. }) => assert_eq!(index, 1),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_sequence_rejects_restarting_finished_run() {
    let events = vec![
        Event::run_started("t", "r"),
        Event::run_finished("t", "r"),
        Event::run_started("t", "r"),
    ];
    assert!(matches!(
        validate_sequence(&events),
        Err(ValidationError::Sequence { index: 2, .. })
    ));
}

#[test]
fn test_sequence_rejects_duplicate_step() {
    let events = vec![Event::step_started("s"), Event::step_started("s")];
    assert!(validate_sequence(&events).is_err());
}

#[test]
fn test_sequence_surfaces_individual_validation_errors() {
    let events = vec![Event::text_message_start("m", Role::Tool)];
    assert!(matches!(
        validate_sequence(&events),
        Err(ValidationError::InvalidRole { .. })
    ));
}
