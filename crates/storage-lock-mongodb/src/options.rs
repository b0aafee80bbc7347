use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mongodb::Client;
use storage_lock_core::{
    ConnectionManager, StorageError, SystemTimeProvider, TimeProvider,
    DEFAULT_STORAGE_DATABASE_NAME, DEFAULT_STORAGE_TABLE_NAME,
};

use crate::connection::MongoConnectionManager;

/// Settings for a `MongoStorage`.
///
/// Nothing here is corrected on the caller's behalf: `validate` rejects an
/// incomplete set of options and `MongoStorage::new` refuses to start with one.
#[derive(Clone)]
pub struct MongoStorageOptions {
    /// Source of the shared client
    pub connection_manager: Option<Arc<dyn ConnectionManager<Client>>>,
    /// Database holding the lock collection
    pub database_name: String,
    /// Collection holding one document per lock
    pub collection_name: String,
    /// Time source answering `Storage::current_time`
    pub time_provider: Arc<dyn TimeProvider>,
    /// Upper bound for each round-trip to MongoDB; unbounded when `None`
    pub operation_timeout: Option<Duration>,
}

impl MongoStorageOptions {
    /// Options using the framework's default database and collection, with no
    /// connection manager yet.
    pub fn new() -> Self {
        Self {
            connection_manager: None,
            database_name: DEFAULT_STORAGE_DATABASE_NAME.to_string(),
            collection_name: DEFAULT_STORAGE_TABLE_NAME.to_string(),
            time_provider: Arc::new(SystemTimeProvider),
            operation_timeout: None,
        }
    }

    /// Default options connecting lazily to `uri`.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::new().with_connection_manager(Arc::new(MongoConnectionManager::from_uri(uri)))
    }

    pub fn with_database_name(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = database_name.into();
        self
    }

    pub fn with_collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }

    pub fn with_connection_manager(
        mut self,
        connection_manager: Arc<dyn ConnectionManager<Client>>,
    ) -> Self {
        self.connection_manager = Some(connection_manager);
        self
    }

    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = Some(operation_timeout);
        self
    }

    /// Check that every required setting is present.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.database_name.trim().is_empty() {
            return Err(StorageError::EmptyDatabaseName);
        }
        if self.collection_name.trim().is_empty() {
            return Err(StorageError::EmptyCollectionName);
        }
        if self.connection_manager.is_none() {
            return Err(StorageError::MissingConnectionManager);
        }
        Ok(())
    }
}

impl Default for MongoStorageOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MongoStorageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoStorageOptions")
            .field(
                "connection_manager",
                &self.connection_manager.as_ref().map(|m| m.name()),
            )
            .field("database_name", &self.database_name)
            .field("collection_name", &self.collection_name)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}
