//! Tests for StateManager

use super::*;
use crate::error::Error;
use crate::stream::Partition;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::tempdir;

const KEY: &str = "lastModifiedDateTime";

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path().to_str().unwrap(), "/tmp/test-state.json");
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
}

#[tokio::test]
async fn test_from_json() {
    let manager = StateManager::from_json(
        r#"{"bookmarks": {"account": {"partitions": {"default": {
            "context": {},
            "replication_key": "lastModifiedDateTime",
            "replication_key_value": "2023-04-05T06:07:08Z"
        }}}}}"#,
    )
    .unwrap();

    assert!(manager.is_in_memory());
    assert_eq!(
        manager.bookmark("account", &Partition::new()).await,
        Some(Utc.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap())
    );
    assert_eq!(manager.bookmark("customer", &Partition::new()).await, None);
}

#[test]
fn test_from_json_empty_and_invalid() {
    assert!(StateManager::from_json("").is_ok());
    assert!(StateManager::from_json("{}").is_ok());
    assert!(matches!(
        StateManager::from_json("{not json").unwrap_err(),
        Error::State { .. }
    ));
}

// ============================================================================
// Bookmark Tests
// ============================================================================

#[tokio::test]
async fn test_advance_bookmark_is_monotonic() {
    let manager = StateManager::in_memory();
    let partition = Partition::new().with_value("financialYear", 2023);
    let first = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap();

    assert!(manager.advance_bookmark("budget", KEY, &partition, first).await);
    assert!(manager.advance_bookmark("budget", KEY, &partition, later).await);
    assert!(!manager.advance_bookmark("budget", KEY, &partition, first).await);

    assert_eq!(manager.bookmark("budget", &partition).await, Some(later));
}

#[tokio::test]
async fn test_partitions_are_independent() {
    let manager = StateManager::in_memory();
    let p2022 = Partition::new().with_value("financialYear", 2022);
    let p2023 = Partition::new().with_value("financialYear", 2023);
    let ts = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    manager.advance_bookmark("budget", KEY, &p2023, ts).await;

    assert_eq!(manager.bookmark("budget", &p2023).await, Some(ts));
    assert_eq!(manager.bookmark("budget", &p2022).await, None);
}

#[tokio::test]
async fn test_clones_share_state() {
    let manager = StateManager::in_memory();
    let clone = manager.clone();
    let ts = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    clone.advance_bookmark("account", KEY, &Partition::new(), ts).await;
    assert_eq!(manager.bookmark("account", &Partition::new()).await, Some(ts));
}

#[tokio::test]
async fn test_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let ts = Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();

    let manager = StateManager::new(&path);
    manager.advance_bookmark("account", KEY, &Partition::new(), ts).await;
    manager.checkpoint().await.unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reloaded = StateManager::from_file(&path).unwrap();
    assert_eq!(reloaded.bookmark("account", &Partition::new()).await, Some(ts));
}

#[tokio::test]
async fn test_from_missing_file_starts_empty() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("missing.json")).unwrap();
    assert_eq!(manager.snapshot().await, State::new());
}

#[tokio::test]
async fn test_in_memory_save_is_noop() {
    let manager = StateManager::in_memory();
    manager.checkpoint().await.unwrap();
    assert_eq!(manager.to_value().await.unwrap(), json!({"bookmarks": {}}));
}

#[tokio::test]
async fn test_concurrent_checkpoints() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let manager = StateManager::new(&path);

    let mut handles = Vec::new();
    for day in 1..=8u32 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let ts = Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap();
            manager
                .advance_bookmark(&format!("stream{day}"), KEY, &Partition::new(), ts)
                .await;
            manager.checkpoint().await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reloaded = StateManager::from_file(&path).unwrap();
    assert_eq!(reloaded.snapshot().await.bookmarks.len(), 8);
}
