use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Source of the current instant used for lease arithmetic.
///
/// Every participant of a lock must read time from a source that agrees across
/// machines, such as an NTP-synchronised clock or the database server itself.
#[async_trait]
pub trait TimeProvider: Send + Sync {
    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError>;
}

/// Reads the local system clock.
///
/// Only safe when every host keeps its clock in sync, e.g. through chrony or
/// ntpd.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

#[async_trait]
impl TimeProvider for SystemTimeProvider {
    async fn current_time(&self) -> Result<DateTime<Utc>, StorageError> {
        Ok(Utc::now())
    }
}
