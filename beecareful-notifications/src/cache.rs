//! Notification cache operations on top of a `NotificationStore`.

use crate::model::{AlertStatus, Notification, NotificationData, PushPayload};
use crate::store::{NotificationStore, StoreError};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

const DEFAULT_TITLE: &str = "New notification";

pub struct NotificationCache<S: NotificationStore> {
    store: S,
}

impl<S: NotificationStore> NotificationCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All notifications, newest first.
    pub fn fetch_all(&self) -> Result<Vec<Notification>, StoreError> {
        let mut all = self.store.get_all()?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    /// False when no notification has this id.
    pub fn mark_as_read(&self, id: &str) -> Result<bool, StoreError> {
        let Some(mut notification) = self.store.get(id)? else {
            return Ok(false);
        };
        if !notification.read {
            notification.read = true;
            self.store.put(notification)?;
        }
        Ok(true)
    }

    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.store.delete(id)?;
        if removed {
            debug!("notification {} deleted", id);
        }
        Ok(removed)
    }

    /// Returns how many notifications changed.
    pub fn mark_all_as_read(&self) -> Result<usize, StoreError> {
        let unread: Vec<Notification> = self
            .store
            .get_all()?
            .into_iter()
            .filter(|n| !n.read)
            .map(|n| Notification { read: true, ..n })
            .collect();
        let changed = unread.len();
        if changed > 0 {
            self.store.put_many(unread)?;
        }
        Ok(changed)
    }

    pub fn unread_count(&self) -> Result<usize, StoreError> {
        Ok(self.store.get_all()?.iter().filter(|n| !n.read).count())
    }

    pub fn ingest_push(&self, payload: &PushPayload) -> Result<Notification, StoreError> {
        self.ingest_push_at(payload, OffsetDateTime::now_utc())
    }

    /// Converts a delivered push message into an unread notification and
    /// stores it.
    pub fn ingest_push_at(&self, payload: &PushPayload, now: OffsetDateTime) -> Result<Notification, StoreError> {
        let notification = notification_from_push(payload, now, |id| Ok(self.store.get(id)?.is_some()))?;
        self.store.put(notification.clone())?;
        info!("stored notification {} ({})", notification.id, notification.title);
        Ok(notification)
    }

    pub fn purge_older_than(&self, retention: Duration) -> Result<usize, StoreError> {
        let cutoff = OffsetDateTime::now_utc() - retention;
        self.purge_before(cutoff)
    }

    /// Deletes every notification created before `cutoff`.
    pub fn purge_before(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError> {
        let mut purged = 0;
        for notification in self.store.get_all()? {
            if notification.created_at < cutoff && self.store.delete(&notification.id)? {
                purged += 1;
            }
        }
        if purged > 0 {
            info!("purged {} notifications past retention", purged);
        }
        Ok(purged)
    }
}

fn notification_from_push<F>(payload: &PushPayload, now: OffsetDateTime, exists: F) -> Result<Notification, StoreError>
where
    F: Fn(&str) -> Result<bool, StoreError>,
{
    let title = payload
        .notification_title()
        .or_else(|| payload.data_field("alertTitle"))
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    let body = payload
        .notification_body()
        .or_else(|| payload.data_field("alertBody"))
        .unwrap_or("")
        .to_string();

    let data = payload.data_field("beehiveId").map(|beehive_id| {
        let status = match payload.data_field("status") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, treating as warning", e);
                AlertStatus::Warning
            }),
            None => AlertStatus::Warning,
        };
        NotificationData {
            beehive_id: beehive_id.to_string(),
            message: payload.data_field("message").unwrap_or(&body).to_string(),
            status,
            nickname: None,
        }
    });

    let id = match payload.message_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => {
            let millis = now.unix_timestamp_nanos() / 1_000_000;
            let candidate = format!("notification_{millis}");
            if exists(&candidate)? {
                let suffix = uuid::Uuid::new_v4().simple().to_string();
                format!("{candidate}_{}", &suffix[..8])
            } else {
                candidate
            }
        }
    };

    Ok(Notification {
        id,
        title,
        body,
        data,
        read: false,
        created_at: now,
    })
}

/// Fills `data.nickname` from the hive list. `lookup` maps a beehive id to
/// its nickname. Notifications for unknown hives keep no nickname.
pub fn enrich_with_nicknames<F>(notifications: &mut [Notification], lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for notification in notifications.iter_mut() {
        if let Some(data) = notification.data.as_mut() {
            data.nickname = lookup(&data.beehive_id);
        }
    }
}
