use thiserror::Error;

/// Errors that can occur in the storage layer.
///
/// The lock algorithm branches on `VersionMismatch` and `LockNotFound`; every
/// other variant is surfaced to its caller as-is.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database name can not be empty")]
    EmptyDatabaseName,

    #[error("collection name can not be empty")]
    EmptyCollectionName,

    #[error("connection manager is missing")]
    MissingConnectionManager,

    /// A version-gated write matched nothing, or a create collided with an
    /// existing lock. The lock may be absent, owned by someone else, or at a
    /// different version.
    #[error("lock version mismatch")]
    VersionMismatch,

    #[error("lock not found")]
    LockNotFound,

    #[error("connection manager has been shut down")]
    ConnectionClosed,

    #[error("storage has been closed")]
    StorageClosed,

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An error raised by the backend driver, passed through untouched.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wrap a backend driver error without altering it.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Backend(Box::new(err))
    }

    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, StorageError::VersionMismatch)
    }

    pub fn is_lock_not_found(&self) -> bool {
        matches!(self, StorageError::LockNotFound)
    }

    /// The backend error carried by `Backend`, downcast to its concrete type.
    pub fn backend_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            StorageError::Backend(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("socket reset")]
    struct SocketReset;

    #[test]
    fn test_backend_error_is_passed_through() {
        let err = StorageError::backend(SocketReset);
        assert_eq!(err.to_string(), "backend error: socket reset");
        assert!(err.backend_error::<SocketReset>().is_some());
        assert!(err.backend_error::<std::io::Error>().is_none());

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "socket reset");
    }

    #[test]
    fn test_predicates() {
        assert!(StorageError::VersionMismatch.is_version_mismatch());
        assert!(!StorageError::VersionMismatch.is_lock_not_found());
        assert!(StorageError::LockNotFound.is_lock_not_found());
        assert!(!StorageError::StorageClosed.is_version_mismatch());
    }
}
