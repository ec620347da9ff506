//! Local cache of push notifications received by the BeeCareful client.

pub mod cache;
pub mod json_store;
pub mod model;
pub mod store;

pub use cache::{enrich_with_nicknames, NotificationCache};
pub use json_store::JsonFileStore;
pub use model::{AlertStatus, Notification, NotificationData, PushNotification, PushPayload};
pub use store::{MemoryStore, NotificationStore, StoreError};
