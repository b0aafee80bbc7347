use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::lock_information::LockInformation;

/// Optimistic-concurrency token of a lock record.
///
/// Starts at whatever the creator chooses and moves forward by one on every
/// successful update. No storage operation ever lowers it.
pub type Version = u64;

/// Forward-only, single-pass walk over the locks held by a storage.
///
/// Not restartable. Callers that share one across tasks must synchronise
/// access themselves.
#[async_trait]
pub trait LockInformationIterator: Send {
    /// Move to the next lock, waiting on the backend if needed.
    ///
    /// Returns `false` once the sequence is exhausted or the backend failed;
    /// read failures end the walk without being reported.
    async fn advance(&mut self) -> bool;

    /// Decode the lock the iterator currently points at.
    ///
    /// `None` before the first `advance`, after exhaustion, or when the stored
    /// record can not be decoded.
    fn current(&self) -> Option<LockInformation>;

    /// Strict variant of `advance` + `current` that reports read and decode
    /// failures instead of swallowing them.
    async fn try_next(&mut self) -> Result<Option<LockInformation>, StorageError>;
}

/// Storage backend for the distributed lock algorithm.
///
/// Every mutation is version-gated: it only applies when the stored lock
/// matches the caller's lock id, owner id and expected version, and otherwise
/// has no effect at all. The storage keeps no copy of any record between
/// calls; every operation is a round-trip to the backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Identifies the driver in the lock framework's registry.
    fn name(&self) -> &'static str;

    /// Insert a new lock record.
    ///
    /// # Errors
    /// * `VersionMismatch` - A record with `lock_id` already exists
    async fn create_with_version(
        &self,
        lock_id: &str,
        version: Version,
        owner_id: &str,
        lock_json: &str,
    ) -> Result<(), StorageError>;

    /// Replace owner, version and payload of a lock held by `owner_id` at
    /// `expected_version`.
    ///
    /// # Errors
    /// * `VersionMismatch` - The lock is absent, held by another owner, or no
    ///   longer at `expected_version`
    async fn update_with_version(
        &self,
        lock_id: &str,
        expected_version: Version,
        new_version: Version,
        owner_id: &str,
        lock_json: &str,
    ) -> Result<(), StorageError>;

    /// Delete a lock held by `owner_id` at `expected_version`.
    ///
    /// # Errors
    /// * `VersionMismatch` - Same conditions as `update_with_version`
    async fn delete_with_version(
        &self,
        lock_id: &str,
        expected_version: Version,
        owner_id: &str,
    ) -> Result<(), StorageError>;

    /// Fetch the payload stored for `lock_id`.
    ///
    /// # Errors
    /// * `LockNotFound` - No record exists for `lock_id`
    async fn get(&self, lock_id: &str) -> Result<String, StorageError>;

    /// Walk every lock in the storage.
    async fn list(&self) -> Result<Box<dyn LockInformationIterator>, StorageError>;

    /// Current time according to a source shared by all lock participants.
    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError>;

    /// Release this storage's handles on the backend.
    ///
    /// Connections belong to the connection manager and stay open.
    async fn close(&self) -> Result<(), StorageError>;
}
