//! Core traits and types for storage-lock storage backends.
//!
//! This crate defines the contracts shared between the distributed lock
//! algorithm and the storage drivers it runs on:
//! - `Storage`: Version-gated create/update/delete of lock records, lookup and listing
//! - `ConnectionManager`: Acquisition and shutdown of a backend connection
//! - `TimeProvider`: A time source that is consistent across the fleet
//! - `StorageError`: The storage-agnostic error vocabulary the lock algorithm relies on

mod connection;
mod error;
mod lock_information;
mod storage;
mod time;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connection::ConnectionManager;
pub use error::StorageError;
pub use lock_information::LockInformation;
pub use storage::{LockInformationIterator, Storage, Version};
pub use time::{SystemTimeProvider, TimeProvider};

/// Database used by storage drivers when the caller does not name one.
pub const DEFAULT_STORAGE_DATABASE_NAME: &str = "storage_lock";

/// Table (or collection) used by storage drivers when the caller does not name one.
pub const DEFAULT_STORAGE_TABLE_NAME: &str = "storage_lock";
