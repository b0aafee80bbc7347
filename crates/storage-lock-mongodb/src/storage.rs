use std::future::IntoFuture;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use mongodb::Collection;
use storage_lock_core::{LockInformationIterator, Storage, StorageError, Version};
use tracing::{debug, info, instrument};

use crate::error::is_duplicate_key;
use crate::iterator::ListMongoLockIterator;
use crate::options::MongoStorageOptions;
use crate::record::{id_filter, replacement_update, version_filter, MongoLock};

pub const MONGO_STORAGE_NAME: &str = "mongodb-storage";

/// Lock storage backed by a MongoDB collection.
///
/// Each mutation is a single filtered write on one document, so concurrent
/// callers racing on the same lock are serialised by the server: at most one
/// of them matches, the others get `VersionMismatch`. No client-side locking
/// is involved.
///
/// The client comes from the configured connection manager and is shared with
/// every other storage built from it. `close` only drops this storage's
/// collection handle.
pub struct MongoStorage {
    options: MongoStorageOptions,
    collection: RwLock<Option<Collection<MongoLock>>>,
}

impl MongoStorage {
    /// Validate `options`, take a client and bind the lock collection.
    pub async fn new(options: MongoStorageOptions) -> Result<Self, StorageError> {
        options.validate()?;
        let manager = options
            .connection_manager
            .clone()
            .ok_or(StorageError::MissingConnectionManager)?;

        let client = manager.take().await?;
        let collection = client
            .database(&options.database_name)
            .collection::<MongoLock>(&options.collection_name);

        info!(
            "MongoDB storage bound to {}.{}",
            options.database_name, options.collection_name
        );
        Ok(Self {
            options,
            collection: RwLock::new(Some(collection)),
        })
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn collection(&self) -> Result<Collection<MongoLock>, StorageError> {
        self.collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StorageError::StorageClosed)
    }

    /// Run one request against MongoDB, bounded by the configured timeout.
    ///
    /// The outer error is the timeout; the inner result is the server's
    /// answer, left for the caller to interpret.
    async fn send<R, T>(
        &self,
        operation: &'static str,
        request: R,
    ) -> Result<mongodb::error::Result<T>, StorageError>
    where
        R: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        match self.options.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, request.into_future())
                .await
                .map_err(|_| StorageError::Timeout { operation }),
            None => Ok(request.into_future().await),
        }
    }
}

#[async_trait]
impl Storage for MongoStorage {
    fn name(&self) -> &'static str {
        MONGO_STORAGE_NAME
    }

    #[instrument(skip(self, lock_json), level = "debug")]
    async fn create_with_version(
        &self,
        lock_id: &str,
        version: Version,
        owner_id: &str,
        lock_json: &str,
    ) -> Result<(), StorageError> {
        let collection = self.collection()?;
        let record = MongoLock::new(lock_id, owner_id, version, lock_json)?;

        match self.send("insert", collection.insert_one(&record)).await? {
            Ok(_) => {
                debug!("Created lock {} at version {}", lock_id, version);
                Ok(())
            }
            // The primary key is the lock id: a collision means the lock is
            // already held.
            Err(e) if is_duplicate_key(&e) => {
                debug!("Lock {} already exists", lock_id);
                Err(StorageError::VersionMismatch)
            }
            Err(e) => Err(StorageError::backend(e)),
        }
    }

    #[instrument(skip(self, lock_json), level = "debug")]
    async fn update_with_version(
        &self,
        lock_id: &str,
        expected_version: Version,
        new_version: Version,
        owner_id: &str,
        lock_json: &str,
    ) -> Result<(), StorageError> {
        let collection = self.collection()?;
        let filter = version_filter(lock_id, owner_id, expected_version)?;
        let update = replacement_update(owner_id, new_version, lock_json)?;

        let result = self
            .send("update", collection.update_one(filter, update))
            .await?
            .map_err(StorageError::backend)?;

        // Absent, foreign owner and stale version all end up here.
        if result.modified_count == 0 {
            debug!(
                "Lock {} not updated: no record held by {} at version {}",
                lock_id, owner_id, expected_version
            );
            return Err(StorageError::VersionMismatch);
        }

        debug!(
            "Updated lock {} from version {} to {}",
            lock_id, expected_version, new_version
        );
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_with_version(
        &self,
        lock_id: &str,
        expected_version: Version,
        owner_id: &str,
    ) -> Result<(), StorageError> {
        let collection = self.collection()?;
        let filter = version_filter(lock_id, owner_id, expected_version)?;

        let result = self
            .send("delete", collection.delete_one(filter))
            .await?
            .map_err(StorageError::backend)?;

        if result.deleted_count == 0 {
            debug!(
                "Lock {} not deleted: no record held by {} at version {}",
                lock_id, owner_id, expected_version
            );
            return Err(StorageError::VersionMismatch);
        }

        debug!("Deleted lock {} at version {}", lock_id, expected_version);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, lock_id: &str) -> Result<String, StorageError> {
        let collection = self.collection()?;

        let record = self
            .send("find", collection.find_one(id_filter(lock_id)))
            .await?
            .map_err(StorageError::backend)?;

        match record {
            Some(record) => Ok(record.lock_json_string),
            None => {
                debug!("Lock {} not found", lock_id);
                Err(StorageError::LockNotFound)
            }
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn list(&self) -> Result<Box<dyn LockInformationIterator>, StorageError> {
        let collection = self.collection()?;

        let cursor = self
            .send("list", collection.find(doc! {}))
            .await?
            .map_err(StorageError::backend)?;

        Ok(Box::new(ListMongoLockIterator::new(cursor)))
    }

    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError> {
        // MongoDB offers no cheap way to read the server clock; a
        // synchronised time provider stands in for it.
        self.options.time_provider.current_time().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        let released = self
            .collection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            info!(
                "MongoDB storage on {}.{} closed",
                self.options.database_name, self.options.collection_name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::TimeZone;
    use mongodb::Client;
    use storage_lock_core::{ConnectionManager, TimeProvider};

    use super::*;
    use crate::connection::MongoConnectionManager;

    /// Nothing listens here; requests wait on server selection.
    const UNREACHABLE_URI: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=60000";

    struct FixedTime(DateTime<Utc>);

    #[async_trait]
    impl TimeProvider for FixedTime {
        async fn current_time(&self) -> Result<DateTime<Utc>, StorageError> {
            Ok(self.0)
        }
    }

    async fn unreachable_storage() -> MongoStorage {
        let options = MongoStorageOptions::from_uri(UNREACHABLE_URI)
            .with_operation_timeout(Duration::from_millis(100));
        MongoStorage::new(options).await.unwrap()
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_options() {
        let err = MongoStorage::new(MongoStorageOptions::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::MissingConnectionManager));

        let options = MongoStorageOptions::from_uri(UNREACHABLE_URI).with_collection_name("");
        let err = MongoStorage::new(options).await.err().unwrap();
        assert!(matches!(err, StorageError::EmptyCollectionName));
    }

    #[tokio::test]
    async fn test_new_fails_when_connection_fails() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let manager = Arc::new(MongoConnectionManager::with_connector(
            "invalid://uri",
            move |uri| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Client::with_uri_str(uri).await }
            },
        ));
        let options = MongoStorageOptions::new().with_connection_manager(manager.clone());

        let err = MongoStorage::new(options.clone()).await.err().unwrap();
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(MongoStorage::new(options).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_operations_honor_timeout() {
        let storage = unreachable_storage().await;

        let err = storage.get("L1").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout { operation: "find" }));

        let err = storage
            .update_with_version("L1", 1, 2, "owner-a", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Timeout { operation: "update" }));
    }

    #[tokio::test]
    async fn test_caller_deadline_returns_promptly() {
        let options = MongoStorageOptions::from_uri(UNREACHABLE_URI);
        let storage = MongoStorage::new(options).await.unwrap();

        // Server selection would wait 60s; the caller's deadline wins.
        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            storage.create_with_version("L1", 1, "owner-a", "{}"),
        )
        .await;
        assert!(outcome.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));

        // The abandoned request leaves the storage usable.
        assert!(!storage.is_closed());
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_releases_collection_only() {
        let manager = Arc::new(MongoConnectionManager::from_uri(UNREACHABLE_URI));
        let options = MongoStorageOptions::new().with_connection_manager(manager.clone());
        let first = MongoStorage::new(options.clone()).await.unwrap();
        let second = MongoStorage::new(options).await.unwrap();

        first.close().await.unwrap();
        first.close().await.unwrap();
        assert!(first.is_closed());
        assert!(matches!(
            first.get("L1").await.unwrap_err(),
            StorageError::StorageClosed
        ));
        assert!(matches!(
            first.list().await.err().unwrap(),
            StorageError::StorageClosed
        ));

        // The shared client is still available to other storages.
        assert!(!second.is_closed());
        assert!(manager.take().await.is_ok());
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_version_fails_before_io() {
        let storage = unreachable_storage().await;
        let err = storage
            .delete_with_version("L1", u64::MAX, "owner-a")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_current_time_uses_time_provider() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let options = MongoStorageOptions::from_uri(UNREACHABLE_URI)
            .with_time_provider(Arc::new(FixedTime(instant)));
        let storage = MongoStorage::new(options).await.unwrap();

        assert_eq!(storage.current_time().await.unwrap(), instant);
        assert_eq!(storage.name(), MONGO_STORAGE_NAME);
    }
}
