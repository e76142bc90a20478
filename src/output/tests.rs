//! Tests for Singer output

use super::*;
use crate::schema::{FieldType, Schema};
use crate::stream::StreamDefinition;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn department() -> StreamDefinition {
    StreamDefinition::builder("department", "/controller/api/v1/department")
        .primary_keys(["departmentId"])
        .replication_key("lastModifiedDateTime")
        .schema(
            Schema::new()
                .property("departmentId", FieldType::String)
                .property("lastModifiedDateTime", FieldType::DateTime),
        )
        .build()
        .unwrap()
}

// ============================================================================
// Message Tests
// ============================================================================

#[test]
fn test_schema_message_wire_format() {
    let message = Message::schema(&department());
    let value = serde_json::to_value(&message).unwrap();

    assert_eq!(value["type"], "SCHEMA");
    assert_eq!(value["stream"], "department");
    assert_eq!(value["key_properties"], json!(["departmentId"]));
    assert_eq!(value["bookmark_properties"], json!(["lastModifiedDateTime"]));
    assert_eq!(value["schema"]["type"], "object");
    assert_eq!(message.stream(), Some("department"));
}

#[test]
fn test_record_message_wire_format() {
    let extracted = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let message = Message::record("department", json!({"departmentId": "A"}), extracted);

    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({
            "type": "RECORD",
            "stream": "department",
            "record": {"departmentId": "A"},
            "time_extracted": "2024-01-01T12:00:00Z"
        })
    );
}

#[test]
fn test_state_message_round_trip() {
    let message = Message::state(json!({"bookmarks": {}}));
    let line = serde_json::to_string(&message).unwrap();
    assert_eq!(line, r#"{"type":"STATE","value":{"bookmarks":{}}}"#);

    let parsed: Message = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed, message);
    assert_eq!(parsed.stream(), None);
}

// ============================================================================
// Sink Tests
// ============================================================================

#[tokio::test]
async fn test_json_lines_sink_writes_one_line_per_message() {
    let sink = JsonLinesSink::new(Vec::new());
    sink.write(&Message::schema(&department())).await.unwrap();
    sink.write(&Message::state(json!({"bookmarks": {}})))
        .await
        .unwrap();
    sink.flush().await.unwrap();

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(parsed.get("type").is_some());
    }
}

#[tokio::test]
async fn test_json_lines_sink_concurrent_writes_stay_whole() {
    let sink = Arc::new(JsonLinesSink::new(Vec::new()));
    let extracted = Utc::now();

    let mut handles = Vec::new();
    for i in 0..16 {
        let sink = Arc::clone(&sink);
        handles.push(tokio::spawn(async move {
            sink.write(&Message::record("account", json!({"id": i}), extracted))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let sink = Arc::try_unwrap(sink).unwrap();
    let output = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(output.lines().count(), 16);
    assert!(output
        .lines()
        .all(|line| serde_json::from_str::<serde_json::Value>(line).is_ok()));
}

#[tokio::test]
async fn test_memory_sink_filters() {
    let sink = MemorySink::new();
    let extracted = Utc::now();
    sink.write(&Message::record("a", json!({"id": 1}), extracted))
        .await
        .unwrap();
    sink.write(&Message::record("b", json!({"id": 2}), extracted))
        .await
        .unwrap();
    sink.write(&Message::state(json!({"bookmarks": {}})))
        .await
        .unwrap();

    assert_eq!(sink.messages().await.len(), 3);
    assert_eq!(sink.records("a").await, vec![json!({"id": 1})]);
    assert_eq!(sink.states().await, vec![json!({"bookmarks": {}})]);
}
