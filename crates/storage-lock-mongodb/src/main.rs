use clap::Parser;
use storage_lock_core::Storage;
use storage_lock_mongodb::{MongoStorage, MongoStorageConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = MongoStorageConfig::parse();
    let options = config.to_options();
    let connection_manager = options.connection_manager.clone();

    info!("Starting mongodb-storage-probe");
    info!("  Database: {}", config.database);
    info!("  Collection: {}", config.collection);

    let storage = MongoStorage::new(options).await?;
    info!("Storage driver: {}", storage.name());
    info!("Storage time: {}", storage.current_time().await?);

    let mut locks = storage.list().await?;
    let mut count = 0;
    while let Some(lock) = locks.try_next().await? {
        info!(
            "Lock held by {} at version {} (count {}, lease until {})",
            lock.owner_id,
            lock.version,
            lock.lock_count,
            lock.lease_expire_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string())
        );
        count += 1;
    }
    info!("{} locks listed", count);

    storage.close().await?;
    if let Some(manager) = connection_manager {
        manager.shutdown().await?;
    }

    info!("Probe complete");
    Ok(())
}
