//! Persistence seam for notifications: keyed by id, one record per key.

use crate::model::Notification;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait NotificationStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<Notification>, StoreError>;
    fn get(&self, id: &str) -> Result<Option<Notification>, StoreError>;
    /// Inserts or replaces the record with the same id.
    fn put(&self, notification: Notification) -> Result<(), StoreError>;
    /// Batch `put`. Stores that persist on every write override this to
    /// write once.
    fn put_many(&self, notifications: Vec<Notification>) -> Result<(), StoreError> {
        notifications.into_iter().try_for_each(|n| self.put(n))
    }
    /// Returns whether a record was removed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<Notification>, StoreError> {
        Ok(self.records.lock().values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<Notification>, StoreError> {
        Ok(self.records.lock().get(id).cloned())
    }

    fn put(&self, notification: Notification) -> Result<(), StoreError> {
        self.records.lock().insert(notification.id.clone(), notification);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().remove(id).is_some())
    }
}
