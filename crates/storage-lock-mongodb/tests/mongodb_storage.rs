//! Runs against a live server named by `STORAGE_LOCK_MONGO_URI`:
//! `cargo test -- --ignored`.

use std::sync::Arc;

use mongodb::bson::{doc, Document};
use mongodb::Client;
use storage_lock_core::testing::{test_storage, unique_lock_id};
use storage_lock_core::{ConnectionManager, Storage, StorageError};
use storage_lock_mongodb::{MongoConnectionManager, MongoStorage, MongoStorageOptions};

const URI_ENV: &str = "STORAGE_LOCK_MONGO_URI";
const TEST_DATABASE: &str = "storage_lock_test";
const TEST_COLLECTION: &str = "storage_lock_test";

fn test_uri() -> String {
    let uri = std::env::var(URI_ENV).unwrap_or_default();
    assert!(!uri.is_empty(), "{} must name a MongoDB server", URI_ENV);
    uri
}

fn test_options(manager: Arc<MongoConnectionManager>) -> MongoStorageOptions {
    MongoStorageOptions::new()
        .with_connection_manager(manager)
        .with_database_name(TEST_DATABASE)
        .with_collection_name(TEST_COLLECTION)
}

#[tokio::test]
#[ignore = "needs STORAGE_LOCK_MONGO_URI"]
async fn test_mongodb_storage() {
    let uri = test_uri();
    let manager = Arc::new(MongoConnectionManager::from_uri(uri));
    let storage = MongoStorage::new(test_options(manager.clone())).await.unwrap();

    test_storage(&storage).await;

    storage.close().await.unwrap();
    manager.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore = "needs STORAGE_LOCK_MONGO_URI"]
async fn test_stored_document_layout() {
    let uri = test_uri();
    let client = Client::with_uri_str(&uri).await.unwrap();
    let manager = Arc::new(MongoConnectionManager::from_client(client.clone()));
    let storage = MongoStorage::new(test_options(manager.clone())).await.unwrap();

    let lock_id = unique_lock_id("layout");
    storage
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();
    storage
        .update_with_version(&lock_id, 1, 2, "owner-a", r#"{"x":1}"#)
        .await
        .unwrap();

    let raw = client
        .database(TEST_DATABASE)
        .collection::<Document>(TEST_COLLECTION)
        .find_one(doc! { "_id": lock_id.as_str() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.get_str("_id").unwrap(), lock_id);
    assert_eq!(raw.get_str("owner_id").unwrap(), "owner-a");
    assert_eq!(raw.get_i64("version").unwrap(), 2);
    assert_eq!(raw.get_str("lock_json_string").unwrap(), r#"{"x":1}"#);

    storage
        .delete_with_version(&lock_id, 2, "owner-a")
        .await
        .unwrap();
    manager.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore = "needs STORAGE_LOCK_MONGO_URI"]
async fn test_storages_share_one_manager() {
    let uri = test_uri();
    let manager = Arc::new(MongoConnectionManager::from_uri(uri));
    let first = MongoStorage::new(test_options(manager.clone())).await.unwrap();
    let second = MongoStorage::new(test_options(manager.clone())).await.unwrap();

    let lock_id = unique_lock_id("shared");
    first
        .create_with_version(&lock_id, 1, "owner-a", "{}")
        .await
        .unwrap();
    first.close().await.unwrap();

    // Closing one storage leaves the shared client usable.
    assert_eq!(second.get(&lock_id).await.unwrap(), "{}");
    second
        .delete_with_version(&lock_id, 1, "owner-a")
        .await
        .unwrap();

    manager.shutdown().await.unwrap();
    assert!(matches!(
        manager.take().await.unwrap_err(),
        StorageError::ConnectionClosed
    ));
}
