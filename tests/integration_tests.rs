//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → token → paged API requests →
//! Singer messages and checkpointed state

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tap_visma_erp::engine::{ShutdownSignal, StreamStatus};
use tap_visma_erp::output::{Message, MemorySink};
use tap_visma_erp::state::StateManager;
use tap_visma_erp::{Error, Tap, TapConfig};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn config(server: &MockServer) -> TapConfig {
    TapConfig::from_value(json!({
        "tenant_id": "tenant-1",
        "client_id": "client-1",
        "client_secret": "secret-1",
        "start_date": "2023-01-01T00:00:00Z",
        "api_url": format!("{}/API", server.uri()),
        "token_url": format!("{}/connect/token", server.uri()),
        "financial_years": [2023],
        "max_concurrent_streams": 2,
        "http": {"max_retries": 0, "initial_backoff_ms": 1}
    }))
    .unwrap()
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "integration-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

async fn mount_empty(server: &MockServer, entity: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/API/controller/api/v1/{entity}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

fn message_types(messages: &[Message]) -> Vec<&'static str> {
    messages
        .iter()
        .map(|m| match m {
            Message::Schema { .. } => "SCHEMA",
            Message::Record { .. } => "RECORD",
            Message::State { .. } => "STATE",
        })
        .collect()
}

// ============================================================================
// Check / Discover
// ============================================================================

#[tokio::test]
async fn test_check_obtains_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("tenant_id=tenant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "integration-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    tap.check().await.unwrap();
}

#[tokio::test]
async fn test_check_fails_on_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    let err = tap.check().await.unwrap_err();
    assert!(err.aborts_run());
}

#[tokio::test]
async fn test_discover_lists_builtin_streams() {
    let server = MockServer::start().await;
    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();

    let catalog = tap.discover();
    let names: Vec<&str> = catalog["streams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["stream"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "department",
            "account",
            "customer",
            "general_ledger_balance",
            "budget"
        ]
    );
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_read_account_end_to_end() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/API/controller/api/v1/account"))
        .and(header("Authorization", "Bearer integration-token"))
        .and(query_param("pageSize", "1000"))
        .and(query_param("lastModifiedDateTime", "2023-01-01 00:00:00"))
        .respond_with(|req: &Request| {
            let page2 = req.url.query_pairs().any(|(k, v)| k == "pageNumber" && v == "2");
            let body = if page2 {
                json!([
                    {"accountID": 3, "accountCD": "3000", "lastModifiedDateTime": "2024-02-01T08:00:00"}
                ])
            } else {
                json!([
                    {"accountID": 1, "accountCD": "1000", "lastModifiedDateTime": "2024-01-01T08:00:00"},
                    {"accountID": 2, "accountCD": "2000", "lastModifiedDateTime": "2024-03-01T08:00:00",
                     "metadata": {"totalCount": 3}}
                ])
            };
            ResponseTemplate::new(200).set_body_json(body)
        })
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let tap = Tap::new(config(&server), StateManager::new(&state_path)).unwrap();
    let sink = MemorySink::new();

    let report = tap
        .read(&["account".to_string()], &sink, &ShutdownSignal::never())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.records_emitted(), 3);
    assert_eq!(report.streams[0].status(), StreamStatus::Success);
    assert_eq!(report.streams[0].pages_fetched, 2);

    let messages = sink.messages().await;
    let types = message_types(&messages);
    assert_eq!(types.first(), Some(&"SCHEMA"));
    assert_eq!(types.last(), Some(&"STATE"));

    let ids: Vec<Value> = sink
        .records("account")
        .await
        .iter()
        .map(|r| r["accountID"].clone())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);

    let expected_bookmark = json!({
        "context": {},
        "replication_key": "lastModifiedDateTime",
        "replication_key_value": "2024-03-01T08:00:00Z"
    });
    let last_state = sink.states().await.pop().unwrap();
    assert_eq!(
        last_state["bookmarks"]["account"]["partitions"]["default"],
        expected_bookmark
    );

    let persisted: Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(persisted, last_state);
}

#[tokio::test]
async fn test_incremental_read_resumes_from_state() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/API/controller/api/v1/department"))
        .and(query_param("lastModifiedDateTime", "2024-05-01 12:30:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"departmentId": "D1", "description": "Sales", "lastModifiedDateTime": "2024-05-02T00:00:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let state = StateManager::from_json(
        &json!({
            "bookmarks": {
                "department": {
                    "partitions": {
                        "default": {
                            "context": {},
                            "replication_key": "lastModifiedDateTime",
                            "replication_key_value": "2024-05-01T12:30:00Z"
                        }
                    }
                }
            }
        })
        .to_string(),
    )
    .unwrap();

    let tap = Tap::new(config(&server), state).unwrap();
    let sink = MemorySink::new();
    let report = tap
        .read(&["department".to_string()], &sink, &ShutdownSignal::never())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(sink.records("department").await.len(), 1);
    let state = tap.state().snapshot().await;
    let bookmark = &state.bookmarks["department"].partitions["default"];
    assert_eq!(
        bookmark.replication_key_value.as_deref(),
        Some("2024-05-02T00:00:00Z")
    );
}

#[tokio::test]
async fn test_read_budget_flattens_composite_keys() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/API/controller/api/v1/budget"))
        .and(query_param("financialYear", "2023"))
        .and(query_param("branch", "1"))
        .and(query_param("ledger", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "financialYear": "2023",
            "branchNumber": {"number": "1", "name": "Main"},
            "ledger": {"number": "1", "description": "Actual"},
            "account": {"number": "3000", "description": "Revenue"},
            "subaccount": {"id": "0", "description": "Default"},
            "amount": 1200.5,
            "lastModifiedDateTime": "2024-01-15T09:00:00"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    let sink = MemorySink::new();
    let report = tap
        .read(&["budget".to_string()], &sink, &ShutdownSignal::never())
        .await
        .unwrap();

    assert!(report.is_success());
    let records = sink.records("budget").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["account__number"], "3000");
    assert_eq!(records[0]["subaccount__id"], "0");
    assert_eq!(records[0]["branchNumber__number"], "1");
    assert_eq!(records[0]["ledger__number"], "1");
    assert_eq!(records[0]["account"]["description"], "Revenue");

    let state = tap.state().snapshot().await;
    let partition = &state.bookmarks["budget"].partitions["financialYear=2023"];
    assert_eq!(
        Value::Object(partition.context.clone()),
        json!({"financialYear": 2023})
    );
}

#[tokio::test]
async fn test_read_all_streams_emits_schema_first() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    for entity in [
        "department",
        "account",
        "customer",
        "generalLedgerBalance",
        "budget",
    ] {
        mount_empty(&server, entity).await;
    }

    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    let sink = MemorySink::new();
    let report = tap.read(&[], &sink, &ShutdownSignal::never()).await.unwrap();

    assert!(report.is_success());
    let streams: Vec<&str> = report.streams.iter().map(|s| s.stream.as_str()).collect();
    assert_eq!(
        streams,
        vec![
            "department",
            "account",
            "customer",
            "general_ledger_balance",
            "budget"
        ]
    );

    let types = message_types(&sink.messages().await);
    assert_eq!(&types[..5], &["SCHEMA"; 5]);
    assert!(types[5..].iter().all(|t| *t == "STATE"));
}

#[tokio::test]
async fn test_failed_stream_does_not_stop_others() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/API/controller/api/v1/customer"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/API/controller/api/v1/department"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"departmentId": "D1", "lastModifiedDateTime": "2024-01-01T00:00:00"}
        ])))
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    let sink = MemorySink::new();
    let report = tap
        .read(
            &["customer".to_string(), "department".to_string()],
            &sink,
            &ShutdownSignal::never(),
        )
        .await
        .unwrap();

    assert!(!report.is_success());
    assert!(report.aborted.is_none());
    assert_eq!(report.streams[0].status(), StreamStatus::Failure);
    assert_eq!(report.streams[1].status(), StreamStatus::Success);
    assert_eq!(sink.records("department").await.len(), 1);
}

#[tokio::test]
async fn test_token_failure_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    let sink = MemorySink::new();
    let report = tap
        .read(&["account".to_string()], &sink, &ShutdownSignal::never())
        .await
        .unwrap();

    assert!(report.aborted.is_some());
    assert!(!report.is_success());
    assert_eq!(report.records_emitted(), 0);
}

#[tokio::test]
async fn test_unknown_stream_is_rejected_before_output() {
    let server = MockServer::start().await;
    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    let sink = MemorySink::new();

    let err = tap
        .read(&["invoice".to_string()], &sink, &ShutdownSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StreamNotFound { .. }));
    assert!(sink.messages().await.is_empty());
}

#[tokio::test]
async fn test_cancelled_read_issues_no_api_requests() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (trigger, shutdown) = ShutdownSignal::channel();
    trigger.trigger();

    let tap = Tap::new(config(&server), StateManager::in_memory()).unwrap();
    let sink = MemorySink::new();
    let report = tap
        .read(&["account".to_string()], &sink, &shutdown)
        .await
        .unwrap();

    assert_eq!(report.streams[0].status(), StreamStatus::Cancelled);
    assert!(sink.records("account").await.is_empty());
}
