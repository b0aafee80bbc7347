use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::Version;

/// Lock metadata owned by the lock algorithm.
///
/// Storage drivers persist it as an opaque JSON string and only decode it when
/// listing locks. Every field is optional on the wire so that payloads written
/// by older or foreign clients still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockInformation {
    /// Current holder of the lock
    pub owner_id: String,
    /// Version the lock was at when this payload was written
    pub version: Version,
    /// Reentrant acquisition count
    pub lock_count: u32,
    /// When the current holder first acquired the lock
    pub lock_begin_time: Option<DateTime<Utc>>,
    /// When the current lease runs out unless renewed
    pub lease_expire_time: Option<DateTime<Utc>>,
}

impl LockInformation {
    pub fn new(owner_id: impl Into<String>, version: Version) -> Self {
        Self {
            owner_id: owner_id.into(),
            version,
            ..Self::default()
        }
    }

    /// Encode as the payload string stored alongside the lock record.
    pub fn to_json_string(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| {
            StorageError::Serialization(format!("Failed to serialize lock information: {}", e))
        })
    }

    /// Decode a stored payload string.
    pub fn from_json_str(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse lock information: {}", e))
        })
    }
}
