/**
 * JSON FILE STORE - notifications persisted as a JSON array on disk
 *
 * The whole file is loaded into a memory cache on open and rewritten after
 * every mutation. A missing file is created empty. When the rewrite fails
 * the memory cache is rolled back, so it never runs ahead of the file.
 */

use crate::model::Notification;
use crate::store::{NotificationStore, StoreError};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct JsonFileStore {
    records: Mutex<Vec<Notification>>,
    storage_path: PathBuf,
}

impl JsonFileStore {
    pub fn open<P: Into<PathBuf>>(storage_path: P) -> Result<Self, StoreError> {
        let store = JsonFileStore {
            records: Mutex::new(Vec::new()),
            storage_path: storage_path.into(),
        };
        store.load_from_disk()?;
        info!("notification store opened at {}", store.storage_path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    fn load_from_disk(&self) -> Result<(), StoreError> {
        if !self.storage_path.exists() {
            if let Some(parent) = self.storage_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.storage_path, "[]")?;
            debug!("created empty notification file");
            return Ok(());
        }

        let content = fs::read_to_string(&self.storage_path)?;
        let loaded: Vec<Notification> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content)?
        };
        debug!("loaded {} notifications from disk", loaded.len());
        *self.records.lock() = loaded;
        Ok(())
    }

    /// Writes `next` and only then swaps it into `records`.
    fn commit(&self, records: &mut Vec<Notification>, next: Vec<Notification>) -> Result<(), StoreError> {
        if let Err(e) = self.save_to_disk(&next) {
            warn!("notification file not written, keeping previous records: {}", e);
            return Err(e);
        }
        *records = next;
        Ok(())
    }

    // Write to a sibling temp file, then rename over the original.
    fn save_to_disk(&self, records: &[Notification]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(records)?;
        let tmp = self.storage_path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.storage_path)?;
        Ok(())
    }
}

impl NotificationStore for JsonFileStore {
    fn get_all(&self) -> Result<Vec<Notification>, StoreError> {
        Ok(self.records.lock().clone())
    }

    fn get(&self, id: &str) -> Result<Option<Notification>, StoreError> {
        Ok(self.records.lock().iter().find(|n| n.id == id).cloned())
    }

    fn put(&self, notification: Notification) -> Result<(), StoreError> {
        self.put_many(vec![notification])
    }

    fn put_many(&self, notifications: Vec<Notification>) -> Result<(), StoreError> {
        if notifications.is_empty() {
            return Ok(());
        }
        let mut records = self.records.lock();
        let mut next = records.clone();
        for notification in notifications {
            match next.iter_mut().find(|n| n.id == notification.id) {
                Some(existing) => *existing = notification,
                None => next.push(notification),
            }
        }
        self.commit(&mut records, next)
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.lock();
        let mut next = records.clone();
        next.retain(|n| n.id != id);
        if next.len() == records.len() {
            return Ok(false);
        }
        self.commit(&mut records, next)?;
        Ok(true)
    }
}
