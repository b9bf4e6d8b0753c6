//! Integration tests for `LocalStore` against an on-disk SQLite database.
//!
//! Each test gets its own temporary directory so tests can run in
//! parallel.

use std::sync::Arc;

use assert_matches::assert_matches;
use tempfile::TempDir;
use vigil_core::{Monitor, NewMonitorGroup};
use vigil_store::{GroupChange, LocalStore, StoreConfig, StoreError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn open_store() -> (TempDir, LocalStore) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let url = format!("sqlite://{}", dir.path().join("cache.db").display());
    let store = LocalStore::new(StoreConfig::new(url));
    store.initialize().await.expect("store should initialise");
    (dir, store)
}

fn monitor(id: &str, name: &str) -> Monitor {
    let mut m = Monitor::new(id);
    m.service_name = name.to_string();
    m
}

// ---------------------------------------------------------------------------
// Test: initialisation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_initialize_calls_share_one_backend() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("cache.db").display());
    let store = Arc::new(LocalStore::new(StoreConfig::new(url)));

    let (a, b, c) = tokio::join!(store.initialize(), store.initialize(), store.initialize());
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    store.add_devices(&[monitor("m1", "Web1")]).await.unwrap();
    assert_eq!(store.get_all_devices().await.unwrap().len(), 1);
}

#[tokio::test]
async fn writes_before_initialize_are_not_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("cache.db").display());
    let store = LocalStore::new(StoreConfig::new(url));

    // No explicit initialize() call.
    store.add_devices(&[monitor("m1", "Web1")]).await.unwrap();

    let devices = store.get_all_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].system_monitor_id, "m1");
}

#[tokio::test]
async fn unavailable_backend_degrades_to_noops() {
    let store = LocalStore::new(StoreConfig::unavailable());

    store.initialize().await.expect("initialize should not fail");
    assert!(!store.is_available());

    store.add_devices(&[monitor("m1", "Web1")]).await.unwrap();
    store.remove_devices().await.unwrap();
    store.delete_group("anything").await.unwrap();

    assert!(store.get_all_devices().await.unwrap().is_empty());
    assert!(store.get_all_groups().await.unwrap().is_empty());
    assert!(store.get_group("anything").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: devices
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bulk_upsert_replaces_rather_than_merges() {
    let (_dir, store) = open_store().await;

    let mut original = monitor("m1", "Web1");
    original.metrics = vec![1.0, 2.0, 3.0];
    store.add_devices(&[original]).await.unwrap();

    let replacement = monitor("m1", "Web1");
    store.add_devices(&[replacement]).await.unwrap();

    let devices = store.get_all_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert!(devices[0].metrics.is_empty(), "metrics must not be merged");
}

#[tokio::test]
async fn get_devices_by_ids_skips_missing_ids() {
    let (_dir, store) = open_store().await;
    let a = monitor("a", "Alpha");
    let b = monitor("b", "Bravo");
    store.add_devices(&[a.clone(), b.clone()]).await.unwrap();

    let found = store.get_devices_by_ids(&["a", "ghost", "b"]).await.unwrap();

    assert_eq!(found, vec![a, b]);
}

#[tokio::test]
async fn get_all_devices_keeps_insertion_order_across_upserts() {
    let (_dir, store) = open_store().await;
    store
        .add_devices(&[monitor("z", "Zulu"), monitor("a", "Alpha")])
        .await
        .unwrap();
    store.put_device(&monitor("z", "Zulu-renamed")).await.unwrap();

    let names: Vec<String> = store
        .get_all_devices()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.service_name)
        .collect();
    assert_eq!(names, vec!["Zulu-renamed", "Alpha"]);
}

#[tokio::test]
async fn remove_devices_leaves_groups_untouched() {
    let (_dir, store) = open_store().await;
    store.add_devices(&[monitor("m1", "Web1")]).await.unwrap();
    let group_id = store
        .add_group(NewMonitorGroup::new("Edge").with_devices(["m1"]))
        .await
        .unwrap();

    store.remove_devices().await.unwrap();

    assert_eq!(store.device_count().await.unwrap(), 0);
    assert!(store.get_group(&group_id).await.unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Test: groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identical_add_group_calls_yield_distinct_records() {
    let (_dir, store) = open_store().await;
    let input = NewMonitorGroup::new("Databases").with_devices(["db1", "db2"]);

    let first = store.add_group(input.clone()).await.unwrap();
    let second = store.add_group(input).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(store.get_all_groups().await.unwrap().len(), 2);
}

#[tokio::test]
async fn add_group_assigns_timestamps_and_publishes() {
    let (_dir, store) = open_store().await;
    let mut changes = store.changes();

    let id = store
        .add_group(NewMonitorGroup::new("Edge").with_description("edge routers"))
        .await
        .unwrap();

    let stored = store.get_group(&id).await.unwrap().expect("group should exist");
    assert_eq!(stored.created_at, stored.updated_at);
    assert_eq!(stored.description.as_deref(), Some("edge routers"));

    let change = changes.recv().await.expect("change should be published");
    assert_matches!(change, GroupChange::Created(g) if g.id == id);
}

#[tokio::test]
async fn update_group_refreshes_updated_at_only() {
    let (_dir, store) = open_store().await;
    let id = store.add_group(NewMonitorGroup::new("Edge")).await.unwrap();
    let original = store.get_group(&id).await.unwrap().unwrap();

    let mut edited = original.clone();
    edited.name = "Edge routers".to_string();
    let saved = store.update_group(edited).await.unwrap();

    let stored = store.get_group(&id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Edge routers");
    assert_eq!(stored.created_at, original.created_at);
    assert!(stored.updated_at > original.updated_at);
    assert_eq!(stored.updated_at, saved.updated_at);
}

#[tokio::test]
async fn update_group_keeps_stored_created_at() {
    let (_dir, store) = open_store().await;
    let id = store.add_group(NewMonitorGroup::new("Edge")).await.unwrap();
    let original = store.get_group(&id).await.unwrap().unwrap();
    let mut changes = store.changes();

    let mut edited = original.clone();
    edited.created_at = original.created_at - chrono::Duration::days(365);
    let saved = store.update_group(edited).await.unwrap();

    let stored = store.get_group(&id).await.unwrap().unwrap();
    assert_eq!(stored.created_at, original.created_at);
    assert_eq!(saved.created_at, original.created_at);
    assert_matches!(
        changes.try_recv(),
        Ok(GroupChange::Updated(g)) if g.created_at == original.created_at
    );
}

#[tokio::test]
async fn remote_apply_does_not_rewrite_created_at() {
    let (_dir, store) = open_store().await;
    let id = store.add_group(NewMonitorGroup::new("Edge")).await.unwrap();
    let original = store.get_group(&id).await.unwrap().unwrap();

    let mut remote = original.clone();
    remote.name = "Edge (remote)".to_string();
    remote.created_at = original.created_at - chrono::Duration::days(30);
    remote.updated_at = original.updated_at + chrono::Duration::seconds(5);
    assert!(store.apply_remote_group(&remote).await.unwrap());

    let stored = store.get_group(&id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Edge (remote)");
    assert_eq!(stored.created_at, original.created_at);
}

#[tokio::test]
async fn delete_missing_group_is_a_noop() {
    let (_dir, store) = open_store().await;
    store.add_group(NewMonitorGroup::new("Keep me")).await.unwrap();
    let mut changes = store.changes();

    store.delete_group("missing-id").await.expect("should not fail");

    assert_eq!(store.get_all_groups().await.unwrap().len(), 1);
    assert!(changes.try_recv().is_err(), "nothing should be published");
}

#[tokio::test]
async fn delete_group_publishes_deleted() {
    let (_dir, store) = open_store().await;
    let id = store.add_group(NewMonitorGroup::new("Temp")).await.unwrap();
    let mut changes = store.changes();

    store.delete_group(&id).await.unwrap();

    assert!(store.get_group(&id).await.unwrap().is_none());
    assert_matches!(changes.recv().await, Ok(GroupChange::Deleted(deleted)) if deleted == id);
}

#[tokio::test]
async fn invalid_group_name_is_rejected_without_writing() {
    let (_dir, store) = open_store().await;

    let result = store.add_group(NewMonitorGroup::new("x".repeat(51))).await;

    assert_matches!(result, Err(StoreError::Core(_)));
    assert!(store.get_all_groups().await.unwrap().is_empty());
}

#[tokio::test]
async fn remote_group_apply_is_silent_and_ignores_stale_copies() {
    let (_dir, store) = open_store().await;
    let id = store.add_group(NewMonitorGroup::new("Edge")).await.unwrap();
    let current = store.get_group(&id).await.unwrap().unwrap();
    let mut changes = store.changes();

    let mut stale = current.clone();
    stale.name = "Old name".to_string();
    stale.updated_at = current.updated_at - chrono::Duration::seconds(30);
    assert!(!store.apply_remote_group(&stale).await.unwrap());

    let mut fresh = current.clone();
    fresh.name = "New name".to_string();
    fresh.updated_at = current.updated_at + chrono::Duration::seconds(30);
    assert!(store.apply_remote_group(&fresh).await.unwrap());
    assert!(!store.apply_remote_group(&fresh).await.unwrap(), "second apply is a no-op");

    assert_eq!(store.get_group(&id).await.unwrap().unwrap().name, "New name");
    assert!(changes.try_recv().is_err(), "remote writes must not be re-published");
}
