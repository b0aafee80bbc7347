use async_trait::async_trait;
use mongodb::Cursor;
use storage_lock_core::{LockInformation, LockInformationIterator, StorageError};
use tracing::{debug, warn};

use crate::record::MongoLock;

/// Walks the lock collection through a server-side cursor.
///
/// Records are decoded only when asked for, one batch is fetched from the
/// server at a time.
pub struct ListMongoLockIterator {
    cursor: Cursor<MongoLock>,
    positioned: bool,
    exhausted: bool,
}

impl ListMongoLockIterator {
    pub fn new(cursor: Cursor<MongoLock>) -> Self {
        Self {
            cursor,
            positioned: false,
            exhausted: false,
        }
    }

    async fn step(&mut self) -> Result<bool, StorageError> {
        if self.exhausted {
            return Ok(false);
        }
        match self.cursor.advance().await {
            Ok(true) => {
                self.positioned = true;
                Ok(true)
            }
            Ok(false) => {
                debug!("Lock cursor exhausted");
                self.finish();
                Ok(false)
            }
            Err(e) => {
                self.finish();
                Err(StorageError::backend(e))
            }
        }
    }

    fn finish(&mut self) {
        self.positioned = false;
        self.exhausted = true;
    }

    fn decode_current(&self) -> Result<LockInformation, StorageError> {
        let record = self
            .cursor
            .deserialize_current()
            .map_err(|e| StorageError::Serialization(format!("Failed to decode lock record: {}", e)))?;
        record.lock_information()
    }
}

#[async_trait]
impl LockInformationIterator for ListMongoLockIterator {
    async fn advance(&mut self) -> bool {
        match self.step().await {
            Ok(more) => more,
            Err(e) => {
                warn!("Lock listing stopped early: {}", e);
                false
            }
        }
    }

    fn current(&self) -> Option<LockInformation> {
        if !self.positioned {
            return None;
        }
        match self.decode_current() {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Skipping undecodable lock record: {}", e);
                None
            }
        }
    }

    async fn try_next(&mut self) -> Result<Option<LockInformation>, StorageError> {
        if !self.step().await? {
            return Ok(None);
        }
        self.decode_current().map(Some)
    }
}
