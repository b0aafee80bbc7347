use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use storage_lock_core::{LockInformation, StorageError, Version};

/// A lock as stored in MongoDB.
///
/// Field names are the on-disk layout shared with every other client of the
/// collection and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoLock {
    /// Lock id, doubling as the primary key so that at most one record per
    /// lock can exist.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current holder of the lock
    pub owner_id: String,
    /// Bumped by one on every successful update
    pub version: Version,
    /// Opaque payload owned by the lock algorithm
    pub lock_json_string: String,
}

impl MongoLock {
    pub fn new(
        id: &str,
        owner_id: &str,
        version: Version,
        lock_json_string: &str,
    ) -> Result<Self, StorageError> {
        bson_version(version)?;
        Ok(Self {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            version,
            lock_json_string: lock_json_string.to_string(),
        })
    }

    /// Decode the payload into the canonical lock shape.
    pub fn lock_information(&self) -> Result<LockInformation, StorageError> {
        LockInformation::from_json_str(&self.lock_json_string)
    }
}

/// BSON has no unsigned 64-bit integer; versions are stored as int64.
fn bson_version(version: Version) -> Result<i64, StorageError> {
    i64::try_from(version).map_err(|_| {
        StorageError::InvalidArgument(format!(
            "version {} does not fit in a BSON int64",
            version
        ))
    })
}

pub(crate) fn id_filter(lock_id: &str) -> Document {
    doc! { "_id": { "$eq": lock_id } }
}

/// Matches the lock only while `owner_id` holds it at `expected_version`.
pub(crate) fn version_filter(
    lock_id: &str,
    owner_id: &str,
    expected_version: Version,
) -> Result<Document, StorageError> {
    Ok(doc! {
        "_id": { "$eq": lock_id },
        "owner_id": { "$eq": owner_id },
        "version": { "$eq": bson_version(expected_version)? },
    })
}

/// Overwrites every mutable field of the record.
pub(crate) fn replacement_update(
    owner_id: &str,
    new_version: Version,
    lock_json: &str,
) -> Result<Document, StorageError> {
    Ok(doc! {
        "$set": {
            "owner_id": owner_id,
            "version": bson_version(new_version)?,
            "lock_json_string": lock_json,
        }
    })
}
