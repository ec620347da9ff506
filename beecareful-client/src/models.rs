//! Wire types of the BeeCareful REST API (camelCase JSON).

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub type HiveId = i64;
pub type DiagnosisId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hive {
    pub beehive_id: HiveId,
    pub nickname: String,
    pub created_at: String,
    pub x_direction: f64,
    pub y_direction: f64,
    #[serde(default)]
    pub hornet_appeared_at: Option<String>,
    #[serde(default)]
    pub is_infected: bool,
    #[serde(default)]
    pub record_created_at: Option<String>,
    #[serde(default)]
    pub last_diagnosed_at: Option<String>,
    #[serde(default)]
    pub last_diagnosis_id: Option<DiagnosisId>,
    #[serde(default)]
    pub diagnosis_status: Option<i32>,
}

impl Hive {
    pub fn has_hornet_sighting(&self) -> bool {
        self.hornet_appeared_at.is_some()
    }

    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHiveRequest {
    pub nickname: String,
    pub x_direction: f64,
    pub y_direction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHiveRequest {
    pub nickname: String,
    pub x_direction: f64,
    pub y_direction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

/// `GET /api/v1/beehives/:id?month=`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiveDetail {
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
    pub nickname: String,
    #[serde(default)]
    pub turret_id: Option<i64>,
}

impl HiveDetail {
    pub fn has_turret(&self) -> bool {
        self.turret_id.is_some()
    }

    /// Diagnoses, most recent first.
    pub fn diagnoses_newest_first(&self) -> Vec<&Diagnosis> {
        let mut list: Vec<&Diagnosis> = self.diagnoses.iter().collect();
        list.sort_by(|a, b| b.created().cmp(&a.created()));
        list
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub diagnosis_id: DiagnosisId,
    pub created_at: String,
    pub imago_count: u64,
    pub larva_count: u64,
    #[serde(alias = "diagnosis")]
    pub result: DiagnosisResult,
}

impl Diagnosis {
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiagnosisResult {
    #[serde(default)]
    pub larva: LarvaResult,
    #[serde(default)]
    pub imago: ImagoResult,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LarvaResult {
    pub varroa_count: u64,
    pub varroa_ratio: f64,
    pub foul_brood_count: u64,
    pub foul_brood_ratio: f64,
    pub chalk_brood_count: u64,
    pub chalk_brood_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagoResult {
    pub varroa_count: u64,
    pub varroa_ratio: f64,
    pub dwv_count: u64,
    pub dwv_ratio: f64,
}

/// Metadata announced for each photo before upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    pub filename: String,
    pub content_type: String,
    pub expected_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub count: usize,
    pub photos: Vec<PhotoMetadata>,
}

/// One pre-signed upload target. `status > 0` means the server refused
/// this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub filename: String,
    pub status: i32,
    pub pre_signed_url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotatedImages {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub member_login_id: String,
    pub password: String,
    pub member_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub member_login_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub access_token: Option<String>,
    pub token: Option<String>,
}

impl LoginResponse {
    pub(crate) fn into_token(self) -> Option<String> {
        self.access_token.or(self.token).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurretLinkRequest {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTokenRequest {
    pub token: String,
}

/// Accepts RFC 3339 (`2024-06-13T10:00:00+09:00`) and offset-less
/// timestamps, the latter taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}
