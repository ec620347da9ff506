//! JSON builders shaped like the BeeCareful backend payloads.

use chrono::Utc;
use serde_json::{json, Value};

/// Member seeded into every `MockBackend`.
pub const TEST_LOGIN_ID: &str = "beekeeper";
pub const TEST_PASSWORD: &str = "honey!2024";
pub const TEST_NAME: &str = "Kim";
pub const TEST_PHONE: &str = "01012345678";
/// Token the mock backend issues and accepts.
pub const TEST_TOKEN: &str = "test-access-token";

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn hive_json(id: i64, nickname: &str, x: f64, y: f64) -> Value {
    json!({
        "beehiveId": id,
        "nickname": nickname,
        "createdAt": now_rfc3339(),
        "xDirection": x,
        "yDirection": y,
        "hornetAppearedAt": null,
        "isInfected": false,
        "recordCreatedAt": null,
        "lastDiagnosedAt": null,
        "lastDiagnosisId": null,
        "diagnosisStatus": null
    })
}

/// A diagnosis with some varroa in both stages.
pub fn diagnosis_json(id: i64, created_at: &str) -> Value {
    json!({
        "diagnosisId": id,
        "createdAt": created_at,
        "imagoCount": 30000,
        "larvaCount": 12000,
        "result": {
            "larva": {
                "varroaCount": 1200, "varroaRatio": 10.0,
                "foulBroodCount": 1000, "foulBroodRatio": 8.3,
                "chalkBroodCount": 500, "chalkBroodRatio": 4.2
            },
            "imago": {
                "varroaCount": 300, "varroaRatio": 1.0,
                "dwvCount": 450, "dwvRatio": 1.5
            }
        }
    })
}

pub fn page_info_json(total: usize) -> Value {
    json!({
        "page": 1,
        "size": 10,
        "totalElements": total,
        "totalPages": if total == 0 { 0 } else { total.div_ceil(10) },
        "hasPrevious": false,
        "hasNext": total > 10
    })
}

/// Builder for push payloads as delivered by the messaging service.
#[derive(Debug, Default, Clone)]
pub struct PushBuilder {
    message_id: Option<String>,
    title: Option<String>,
    body: Option<String>,
    data: serde_json::Map<String, Value>,
}

impl PushBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_id(mut self, id: &str) -> Self {
        self.message_id = Some(id.to_string());
        self
    }

    pub fn notification(mut self, title: &str, body: &str) -> Self {
        self.title = Some(title.to_string());
        self.body = Some(body.to_string());
        self
    }

    pub fn data(mut self, key: &str, value: &str) -> Self {
        self.data.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn hornet_alert(self, beehive_id: i64) -> Self {
        self.data("beehiveId", &beehive_id.to_string())
            .data("status", "WARNING")
            .data("message", "Hornet sighted near the hive")
    }

    pub fn build(self) -> Value {
        let mut payload = serde_json::Map::new();
        if let Some(id) = self.message_id {
            payload.insert("messageId".into(), Value::String(id));
        }
        if self.title.is_some() || self.body.is_some() {
            payload.insert("notification".into(), json!({ "title": self.title, "body": self.body }));
        }
        if !self.data.is_empty() {
            payload.insert("data".into(), Value::Object(self.data));
        }
        Value::Object(payload)
    }
}
