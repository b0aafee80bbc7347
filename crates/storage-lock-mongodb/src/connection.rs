use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use mongodb::Client;
use storage_lock_core::{ConnectionManager, StorageError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub const MONGO_CONNECTION_MANAGER_NAME: &str = "mongodb-connection-manager";

type Connector =
    Box<dyn Fn(String) -> BoxFuture<'static, mongodb::error::Result<Client>> + Send + Sync>;

/// Connection manager holding a single shared `mongodb::Client`.
///
/// The client is created on the first `take` and handed out to every later
/// caller. Concurrent first callers wait for that one attempt and all see its
/// result. A failed attempt is remembered as well: the manager never retries,
/// so callers that want another attempt build a new manager.
///
/// `mongodb::Client` is itself a pool, so `release` has nothing to do. The
/// client stays open until `shutdown`, even if it was supplied by the caller.
pub struct MongoConnectionManager {
    uri: String,
    connector: Connector,
    client: OnceCell<mongodb::error::Result<Client>>,
    shut_down: AtomicBool,
    disconnected: AtomicBool,
}

impl MongoConnectionManager {
    /// Create a manager that connects to `uri` on first use.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::with_connector(uri, |uri| async move { Client::with_uri_str(uri).await })
    }

    /// Create a manager around an already connected client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client: OnceCell::new_with(Some(Ok(client))),
            ..Self::from_uri(String::new())
        }
    }

    /// Create a manager that builds its client with `connector` on first use.
    ///
    /// The connector receives `uri` and is invoked at most once. It must not
    /// call back into this manager: a `take` issued from inside the connector
    /// waits on the very attempt it belongs to and never completes.
    pub fn with_connector<F, Fut>(uri: impl Into<String>, connector: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = mongodb::error::Result<Client>> + Send + 'static,
    {
        Self {
            uri: uri.into(),
            connector: Box::new(move |uri| Box::pin(connector(uri))),
            client: OnceCell::new(),
            shut_down: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Whether a connection attempt has completed, successfully or not.
    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    async fn connect(&self) -> mongodb::error::Result<Client> {
        info!("Connecting to MongoDB");
        let result = (self.connector)(self.uri.clone()).await;
        match &result {
            Ok(_) => info!("MongoDB client ready"),
            Err(e) => warn!("MongoDB connection failed: {}", e),
        }
        result
    }

    /// Shut the client down, once, if one was established.
    async fn disconnect(&self) {
        let Some(Ok(client)) = self.client.get() else {
            debug!("No MongoDB client to disconnect");
            return;
        };
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Disconnecting MongoDB client");
        client.clone().shutdown().immediate(true).await;
    }
}

impl fmt::Debug for MongoConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URI may carry credentials.
        f.debug_struct("MongoConnectionManager")
            .field("initialized", &self.client.initialized())
            .field("shut_down", &self.shut_down.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ConnectionManager<Client> for MongoConnectionManager {
    fn name(&self) -> &'static str {
        MONGO_CONNECTION_MANAGER_NAME
    }

    async fn take(&self) -> Result<Client, StorageError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionClosed);
        }
        let outcome = self.client.get_or_init(|| self.connect()).await.clone();

        // A shutdown that ran while the connect was in flight saw no client.
        if self.shut_down.load(Ordering::SeqCst) {
            self.disconnect().await;
            return Err(StorageError::ConnectionClosed);
        }
        outcome.map_err(StorageError::backend)
    }

    async fn release(&self, _connection: Client) -> Result<(), StorageError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), StorageError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("MongoDB connection manager already shut down");
            return Ok(());
        }
        self.disconnect().await;
        Ok(())
    }
}
