use async_trait::async_trait;

use crate::error::StorageError;

/// Hands out connections to a storage backend.
///
/// Drivers never open connections themselves: they take one from a manager,
/// which owns the connection lifetime. Several storages may share one manager,
/// so closing a storage must not shut the manager down.
#[async_trait]
pub trait ConnectionManager<C>: Send + Sync {
    /// Identifies the manager implementation.
    fn name(&self) -> &'static str;

    /// Take a connection, establishing it on first use.
    async fn take(&self) -> Result<C, StorageError>;

    /// Give back a connection obtained from `take`.
    async fn release(&self, connection: C) -> Result<(), StorageError>;

    /// Tear down whatever the manager established.
    async fn shutdown(&self) -> Result<(), StorageError>;
}
