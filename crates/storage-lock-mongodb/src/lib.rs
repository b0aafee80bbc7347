//! MongoDB storage backend for the storage-lock distributed lock.
//!
//! Lock records live in a single collection, one document per lock:
//! ```text
//! { _id: <lock id>, owner_id: <holder>, version: <int64>, lock_json_string: <payload> }
//! ```
//! Mutations are filtered on `_id`, `owner_id` and `version` together, so the
//! server's single-document atomicity is the only concurrency control.

mod config;
mod connection;
mod error;
mod iterator;
mod options;
mod record;
mod storage;

pub use config::MongoStorageConfig;
pub use connection::{MongoConnectionManager, MONGO_CONNECTION_MANAGER_NAME};
pub use iterator::ListMongoLockIterator;
pub use options::MongoStorageOptions;
pub use record::MongoLock;
pub use storage::{MongoStorage, MONGO_STORAGE_NAME};
