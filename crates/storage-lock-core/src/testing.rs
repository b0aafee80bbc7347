//! Driver-independent conformance checks for `Storage` implementations.
//!
//! Drivers call [`test_storage`] from their own integration tests against a
//! live backend. Every check works on freshly generated lock ids and cleans up
//! after itself, so the suite can run against a shared collection.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::future::join_all;

use crate::error::StorageError;
use crate::lock_information::LockInformation;
use crate::storage::Storage;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A lock id no other check (or concurrent run) will use.
pub fn unique_lock_id(name: &str) -> String {
    format!(
        "storage-lock-test-{}-{}-{}",
        name,
        Utc::now().timestamp_micros(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

/// Run every check against `storage`.
pub async fn test_storage(storage: &dyn Storage) {
    check_create_then_get(storage).await;
    check_create_twice(storage).await;
    check_update_with_version(storage).await;
    check_delete_with_version(storage).await;
    check_foreign_owner(storage).await;
    check_get_missing(storage).await;
    check_concurrent_updates(storage).await;
    check_list(storage).await;
    check_current_time(storage).await;
}

pub async fn check_create_then_get(storage: &dyn Storage) {
    let lock_id = unique_lock_id("create");
    storage
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();
    assert_eq!(storage.get(&lock_id).await.unwrap(), "{}");

    storage
        .delete_with_version(&lock_id, 1, "owner-a")
        .await
        .unwrap();
}

pub async fn check_create_twice(storage: &dyn Storage) {
    let lock_id = unique_lock_id("create-twice");
    storage
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();

    let err = storage
        .create_with_version(&lock_id, 5, "owner-b", r#"{"x":2}"#)
        .await
        .unwrap_err();
    assert!(err.is_version_mismatch(), "unexpected error: {}", err);

    // The first record is untouched: owner-a at version 1 can still delete it.
    assert_eq!(storage.get(&lock_id).await.unwrap(), "{}");
    assert!(storage
        .delete_with_version(&lock_id, 5, "owner-b")
        .await
        .unwrap_err()
        .is_version_mismatch());
    storage
        .delete_with_version(&lock_id, 1, "owner-a")
        .await
        .unwrap();
}

pub async fn check_update_with_version(storage: &dyn Storage) {
    let lock_id = unique_lock_id("update");
    storage
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();

    storage
        .update_with_version(&lock_id, 1, 2, "owner-a", r#"{"x":1}"#)
        .await
        .unwrap();
    assert_eq!(storage.get(&lock_id).await.unwrap(), r#"{"x":1}"#);

    // Stored version has moved to 2, so the same call is now stale.
    let err = storage
        .update_with_version(&lock_id, 1, 2, "owner-a", r#"{"x":9}"#)
        .await
        .unwrap_err();
    assert!(err.is_version_mismatch(), "unexpected error: {}", err);
    assert_eq!(storage.get(&lock_id).await.unwrap(), r#"{"x":1}"#);

    storage
        .delete_with_version(&lock_id, 2, "owner-a")
        .await
        .unwrap();
}

pub async fn check_delete_with_version(storage: &dyn Storage) {
    let lock_id = unique_lock_id("delete");
    storage
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();
    storage
        .update_with_version(&lock_id, 1, 2, "owner-a", r#"{"x":1}"#)
        .await
        .unwrap();

    let stale = storage
        .delete_with_version(&lock_id, 1, "owner-a")
        .await
        .unwrap_err();
    assert!(stale.is_version_mismatch(), "unexpected error: {}", stale);

    storage
        .delete_with_version(&lock_id, 2, "owner-a")
        .await
        .unwrap();
    assert!(storage.get(&lock_id).await.unwrap_err().is_lock_not_found());

    // Deleting again finds nothing to match.
    assert!(storage
        .delete_with_version(&lock_id, 2, "owner-a")
        .await
        .unwrap_err()
        .is_version_mismatch());
}

pub async fn check_foreign_owner(storage: &dyn Storage) {
    let lock_id = unique_lock_id("foreign-owner");
    storage
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();

    for version in [0, 1, 2] {
        let err = storage
            .update_with_version(&lock_id, version, version + 1, "owner-b", r#"{"x":1}"#)
            .await
            .unwrap_err();
        assert!(err.is_version_mismatch(), "unexpected error: {}", err);

        let err = storage
            .delete_with_version(&lock_id, version, "owner-b")
            .await
            .unwrap_err();
        assert!(err.is_version_mismatch(), "unexpected error: {}", err);
    }
    assert_eq!(storage.get(&lock_id).await.unwrap(), "{}");

    storage
        .delete_with_version(&lock_id, 1, "owner-a")
        .await
        .unwrap();
}

pub async fn check_get_missing(storage: &dyn Storage) {
    let lock_id = unique_lock_id("missing");
    let err = storage.get(&lock_id).await.unwrap_err();
    assert!(err.is_lock_not_found(), "unexpected error: {}", err);

    let err = storage
        .update_with_version(&lock_id, 1, 2, "owner-a", "{}")
        .await
        .unwrap_err();
    assert!(err.is_version_mismatch(), "unexpected error: {}", err);
}

pub async fn check_concurrent_updates(storage: &dyn Storage) {
    let lock_id = unique_lock_id("race");
    storage
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();

    let payloads: Vec<String> = (0..8).map(|i| format!(r#"{{"writer":{}}}"#, i)).collect();
    let results = join_all(
        payloads
            .iter()
            .map(|payload| storage.update_with_version(&lock_id, 1, 2, "owner-a", payload)),
    )
    .await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(result, Err(StorageError::VersionMismatch)));
    }

    storage
        .delete_with_version(&lock_id, 2, "owner-a")
        .await
        .unwrap();
}

pub async fn check_list(storage: &dyn Storage) {
    let owner_id = unique_lock_id("list-owner");
    let lock_ids: Vec<String> = (0..3).map(|_| unique_lock_id("list")).collect();
    let payload = LockInformation::new(owner_id.as_str(), 1)
        .to_json_string()
        .unwrap();
    for lock_id in &lock_ids {
        storage
            .create_with_version(lock_id, 1, &owner_id, &payload)
            .await
            .unwrap();
    }

    let mut iter = storage.list().await.unwrap();
    let mut seen = 0;
    while iter.advance().await {
        if let Some(info) = iter.current() {
            if info.owner_id == owner_id {
                seen += 1;
            }
        }
    }
    assert_eq!(seen, lock_ids.len());
    assert!(!iter.advance().await);
    assert!(iter.current().is_none());

    for lock_id in &lock_ids {
        storage
            .delete_with_version(lock_id, 1, &owner_id)
            .await
            .unwrap();
    }
}

pub async fn check_current_time(storage: &dyn Storage) {
    let now = storage.current_time().await.unwrap();
    let drift = (Utc::now() - now).num_seconds().abs();
    assert!(drift < 60, "storage time drifts by {} seconds", drift);
}
