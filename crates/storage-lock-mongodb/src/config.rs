use std::time::Duration;

use clap::Parser;
use storage_lock_core::{DEFAULT_STORAGE_DATABASE_NAME, DEFAULT_STORAGE_TABLE_NAME};

use crate::options::MongoStorageOptions;

/// Command-line / environment configuration for a MongoDB lock storage.
#[derive(Parser, Debug, Clone)]
#[command(name = "mongodb-storage-probe")]
#[command(about = "Inspect the locks held in a MongoDB lock storage")]
pub struct MongoStorageConfig {
    /// MongoDB connection string
    #[arg(long, env = "STORAGE_LOCK_MONGO_URI")]
    pub uri: String,

    /// Database holding the lock collection
    #[arg(long, default_value = DEFAULT_STORAGE_DATABASE_NAME, env = "STORAGE_LOCK_DATABASE")]
    pub database: String,

    /// Collection holding the lock records
    #[arg(long, default_value = DEFAULT_STORAGE_TABLE_NAME, env = "STORAGE_LOCK_COLLECTION")]
    pub collection: String,

    /// Per-request timeout in milliseconds (unbounded when unset)
    #[arg(long, env = "STORAGE_LOCK_OPERATION_TIMEOUT_MS")]
    pub operation_timeout_ms: Option<u64>,
}

impl MongoStorageConfig {
    /// Storage options connecting lazily to the configured URI.
    pub fn to_options(&self) -> MongoStorageOptions {
        let options = MongoStorageOptions::from_uri(self.uri.clone())
            .with_database_name(self.database.clone())
            .with_collection_name(self.collection.clone());
        match self.operation_timeout_ms {
            Some(ms) => options.with_operation_timeout(Duration::from_millis(ms)),
            None => options,
        }
    }
}
