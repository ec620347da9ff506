use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Severity carried by a hive alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlertStatus {
    /// Hornet sighting.
    #[default]
    Warning,
    /// Diagnosis finished, no disease found.
    Success,
    /// Disease detected.
    Danger,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Warning => "WARNING",
            AlertStatus::Success => "SUCCESS",
            AlertStatus::Danger => "DANGER",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown alert status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AlertStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WARNING" => Ok(AlertStatus::Warning),
            "SUCCESS" => Ok(AlertStatus::Success),
            "DANGER" => Ok(AlertStatus::Danger),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for AlertStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlertStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub beehive_id: String,
    pub message: String,
    pub status: AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Notification {
    pub fn status(&self) -> Option<AlertStatus> {
        self.data.as_ref().map(|d| d.status)
    }

    pub fn beehive_id(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.beehive_id.as_str())
    }
}

/// A push message as handed over by the messaging service. Every `data`
/// value arrives as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub notification: Option<PushNotification>,
    #[serde(default)]
    pub data: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl PushPayload {
    pub fn data_field(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn notification_title(&self) -> Option<&str> {
        self.notification
            .as_ref()
            .and_then(|n| n.title.as_deref())
            .filter(|v| !v.is_empty())
    }

    pub fn notification_body(&self) -> Option<&str> {
        self.notification
            .as_ref()
            .and_then(|n| n.body.as_deref())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("danger".parse::<AlertStatus>().unwrap(), AlertStatus::Danger);
        assert_eq!("Success".parse::<AlertStatus>().unwrap(), AlertStatus::Success);
        assert!("critical".parse::<AlertStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&AlertStatus::Warning).unwrap(), "\"WARNING\"");
        let parsed: AlertStatus = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, AlertStatus::Warning);
    }

    #[test]
    fn test_notification_json_shape() {
        let json = r#"{
            "id": "n1",
            "title": "Hornet",
            "body": "Hive 3",
            "data": {"beehiveId": "3", "message": "Hornet sighted", "status": "WARNING"},
            "read": false,
            "createdAt": "2025-05-10T08:00:00Z"
        }"#;
        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.beehive_id(), Some("3"));
        assert_eq!(n.status(), Some(AlertStatus::Warning));

        let back = serde_json::to_value(&n).unwrap();
        assert_eq!(back["createdAt"], "2025-05-10T08:00:00Z");
        assert!(back["data"].get("nickname").is_none());
    }

    #[test]
    fn test_empty_push_fields_count_as_missing() {
        let payload: PushPayload = serde_json::from_value(serde_json::json!({
            "notification": {"title": "", "body": "b"},
            "data": {"alertTitle": ""}
        }))
        .unwrap();
        assert_eq!(payload.notification_title(), None);
        assert_eq!(payload.notification_body(), Some("b"));
        assert_eq!(payload.data_field("alertTitle"), None);
    }
}
