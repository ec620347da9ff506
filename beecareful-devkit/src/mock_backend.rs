/*!
Mock BeeCareful backend

Serves the REST contract on an ephemeral localhost port so client and app
tests run without a real server. Every request is recorded; failures can be
injected per request or per uploaded file.
*/

use crate::fixtures;
use axum::body::{to_bytes, Body};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const MAX_BODY: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
    pub authorized: bool,
}

#[derive(Debug, Clone)]
struct Member {
    password: String,
}

#[derive(Default)]
struct BackendData {
    members: HashMap<String, Member>,
    hives: BTreeMap<i64, Value>,
    next_hive_id: i64,
    diagnoses: HashMap<i64, Vec<Value>>,
    next_diagnosis_id: i64,
    turrets: HashMap<i64, i64>,
    push_tokens: Vec<String>,
    requests: Vec<RecordedRequest>,
    fail_next: Option<u16>,
    refused_uploads: HashSet<String>,
    failing_puts: HashSet<String>,
    uploads: Vec<String>,
    upload_bodies: HashMap<String, Vec<u8>>,
}

#[derive(Clone)]
struct MockState {
    data: Arc<Mutex<BackendData>>,
    base_url: String,
}

pub struct MockBackend {
    state: MockState,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MockBackend {
    /// Binds `127.0.0.1:0` and serves until dropped. The test member from
    /// [`fixtures`] is already registered.
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let mut data = BackendData {
            next_hive_id: 1,
            next_diagnosis_id: 1,
            ..Default::default()
        };
        data.members.insert(
            fixtures::TEST_LOGIN_ID.to_string(),
            Member { password: fixtures::TEST_PASSWORD.to_string() },
        );

        let state = MockState {
            data: Arc::new(Mutex::new(data)),
            base_url: format!("http://{addr}"),
        };

        let app = build_router(state.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("mock backend stopped: {}", e);
            }
        });

        log::info!("mock backend listening on http://{}", addr);
        Ok(Self { state, addr, task })
    }

    pub fn base_url(&self) -> String {
        self.state.base_url.clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The next request, whatever it is, answers with `status`.
    pub fn fail_next(&self, status: u16) {
        self.state.data.lock().fail_next = Some(status);
    }

    /// Diagnosis requests will hand out a refused slot (`status > 0`) for this file.
    pub fn refuse_upload(&self, filename: &str) {
        self.state.data.lock().refused_uploads.insert(filename.to_string());
    }

    /// PUTs of this file to its pre-signed URL answer 500.
    pub fn fail_put(&self, filename: &str) {
        self.state.data.lock().failing_puts.insert(filename.to_string());
    }

    pub fn seed_hive(&self, nickname: &str, x: f64, y: f64) -> i64 {
        let mut data = self.state.data.lock();
        insert_hive(&mut data, nickname, x, y)
    }

    pub fn seed_diagnosis(&self, hive: i64, created_at: &str) -> i64 {
        let mut data = self.state.data.lock();
        insert_diagnosis(&mut data, hive, created_at)
    }

    pub fn set_hive_field(&self, hive: i64, field: &str, value: Value) {
        if let Some(obj) = self.state.data.lock().hives.get_mut(&hive).and_then(Value::as_object_mut) {
            obj.insert(field.to_string(), value);
        }
    }

    pub fn hives(&self) -> Vec<Value> {
        self.state.data.lock().hives.values().cloned().collect()
    }

    pub fn hive(&self, id: i64) -> Option<Value> {
        self.state.data.lock().hives.get(&id).cloned()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.data.lock().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn push_tokens(&self) -> Vec<String> {
        self.state.data.lock().push_tokens.clone()
    }

    /// Filenames successfully PUT so far.
    pub fn uploads(&self) -> Vec<String> {
        self.state.data.lock().uploads.clone()
    }

    /// Body of the last successful PUT for `filename`.
    pub fn uploaded_bytes(&self, filename: &str) -> Option<Vec<u8>> {
        self.state.data.lock().upload_bodies.get(filename).cloned()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn insert_hive(data: &mut BackendData, nickname: &str, x: f64, y: f64) -> i64 {
    let id = data.next_hive_id;
    data.next_hive_id += 1;
    data.hives.insert(id, fixtures::hive_json(id, nickname, x, y));
    id
}

fn insert_diagnosis(data: &mut BackendData, hive: i64, created_at: &str) -> i64 {
    let id = data.next_diagnosis_id;
    data.next_diagnosis_id += 1;
    data.diagnoses
        .entry(hive)
        .or_default()
        .push(fixtures::diagnosis_json(id, created_at));
    if let Some(obj) = data.hives.get_mut(&hive).and_then(Value::as_object_mut) {
        obj.insert("lastDiagnosisId".into(), json!(id));
        obj.insert("lastDiagnosedAt".into(), json!(created_at));
        obj.insert("isInfected".into(), json!(true));
    }
    id
}

fn build_router(state: MockState) -> Router {
    Router::new()
        .route("/api/v1/members", post(signup))
        .route("/api/v1/members/login", post(login))
        .route("/api/v1/beehives", get(list_hives).post(create_hive))
        .route(
            "/api/v1/beehives/{id}",
            get(hive_detail).patch(update_hive).delete(delete_hive),
        )
        .route("/api/v1/beehives/{id}/turret", post(link_turret))
        .route("/api/v1/beehives/{id}/diagnosis", post(request_diagnosis))
        .route(
            "/api/v1/beehives/{id}/diagnoses/{diagnosis_id}/annotated-images",
            get(annotated_images),
        )
        .route("/upload/{filename}", put(presigned_put))
        .route("/users/fcm-token", post(register_push_token))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_guard))
        .with_state(state)
}

fn is_public(path: &str) -> bool {
    path == "/api/v1/members" || path == "/api/v1/members/login" || path.starts_with("/upload/")
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Records the request, applies injected failures and checks the bearer token.
async fn record_and_guard(State(state): State<MockState>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_BODY).await {
        Ok(b) => b,
        Err(_) => return error(StatusCode::PAYLOAD_TOO_LARGE, "Body too large"),
    };

    let path = parts.uri.path().to_string();
    let authorized = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", fixtures::TEST_TOKEN))
        .unwrap_or(false);

    let injected = {
        let mut data = state.data.lock();
        data.requests.push(RecordedRequest {
            method: parts.method.to_string(),
            path: path.clone(),
            query: parts.uri.query().map(str::to_string),
            body: serde_json::from_slice(&bytes).ok(),
            authorized,
        });
        data.fail_next.take()
    };

    if let Some(status) = injected {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        log::info!("[mock] injected {} for {} {}", status, parts.method, path);
        return error(status, "Injected failure");
    }

    if !is_public(&path) && !authorized {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupBody {
    member_login_id: Option<String>,
    password: Option<String>,
    member_name: Option<String>,
    phone: Option<String>,
}

async fn signup(State(state): State<MockState>, Json(body): Json<SignupBody>) -> Response {
    let (Some(id), Some(password), Some(_), Some(_)) =
        (body.member_login_id, body.password, body.member_name, body.phone)
    else {
        return error(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    let mut data = state.data.lock();
    if data.members.contains_key(&id) {
        return error(StatusCode::CONFLICT, "Username already taken");
    }
    data.members.insert(id, Member { password });
    StatusCode::CREATED.into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    member_login_id: String,
    password: String,
}

async fn login(State(state): State<MockState>, Json(body): Json<LoginBody>) -> Response {
    let ok = state
        .data
        .lock()
        .members
        .get(&body.member_login_id)
        .map(|m| m.password == body.password)
        .unwrap_or(false);

    if !ok {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let mut response = Json(json!({ "accessToken": fixtures::TEST_TOKEN })).into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", fixtures::TEST_TOKEN)) {
        response.headers_mut().insert(header::AUTHORIZATION, value);
    }
    response
}

async fn list_hives(State(state): State<MockState>) -> Json<Vec<Value>> {
    Json(state.data.lock().hives.values().cloned().collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HiveBody {
    nickname: Option<String>,
    x_direction: Option<f64>,
    y_direction: Option<f64>,
}

async fn create_hive(State(state): State<MockState>, Json(body): Json<HiveBody>) -> Response {
    let nickname = body.nickname.unwrap_or_default();
    if nickname.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "Nickname is required");
    }
    let mut data = state.data.lock();
    let id = insert_hive(
        &mut data,
        &nickname,
        body.x_direction.unwrap_or(1000.0),
        body.y_direction.unwrap_or(1000.0),
    );
    let hive = data.hives.get(&id).cloned().unwrap_or(Value::Null);
    (StatusCode::CREATED, Json(hive)).into_response()
}

#[derive(Deserialize)]
struct MonthQuery {
    month: Option<u32>,
}

/// Month of an ISO `createdAt` such as `2024-06-13T10:00:00+09:00`.
fn created_month(diagnosis: &Value) -> Option<u32> {
    diagnosis["createdAt"].as_str()?.get(5..7)?.parse().ok()
}

async fn hive_detail(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    Query(query): Query<MonthQuery>,
) -> Response {
    let data = state.data.lock();
    let Some(hive) = data.hives.get(&id) else {
        return error(StatusCode::NOT_FOUND, "Beehive not found");
    };
    let diagnoses: Vec<Value> = data
        .diagnoses
        .get(&id)
        .map(|list| {
            list.iter()
                .filter(|d| query.month.map_or(true, |m| created_month(d) == Some(m)))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Json(json!({
        "pageInfo": fixtures::page_info_json(diagnoses.len()),
        "diagnoses": diagnoses,
        "nickname": hive["nickname"],
        "turretId": data.turrets.get(&id),
    }))
    .into_response()
}

async fn update_hive(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    Json(body): Json<HiveBody>,
) -> Response {
    let mut data = state.data.lock();
    let Some(hive) = data.hives.get_mut(&id).and_then(Value::as_object_mut) else {
        return error(StatusCode::NOT_FOUND, "Beehive not found");
    };
    if let Some(nickname) = body.nickname {
        hive.insert("nickname".into(), json!(nickname));
    }
    if let Some(x) = body.x_direction {
        hive.insert("xDirection".into(), json!(x));
    }
    if let Some(y) = body.y_direction {
        hive.insert("yDirection".into(), json!(y));
    }
    StatusCode::OK.into_response()
}

async fn delete_hive(State(state): State<MockState>, Path(id): Path<i64>) -> Response {
    let mut data = state.data.lock();
    if data.hives.remove(&id).is_none() {
        return error(StatusCode::NOT_FOUND, "Beehive not found");
    }
    data.diagnoses.remove(&id);
    data.turrets.remove(&id);
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct TurretBody {
    code: String,
}

async fn link_turret(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    Json(body): Json<TurretBody>,
) -> Response {
    let mut data = state.data.lock();
    if !data.hives.contains_key(&id) {
        return error(StatusCode::NOT_FOUND, "Beehive not found");
    }
    if body.code.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "Turret code is required");
    }
    let turret_id = data.turrets.len() as i64 + 1;
    data.turrets.insert(id, turret_id);
    StatusCode::OK.into_response()
}

#[derive(Deserialize)]
struct PhotoBody {
    filename: String,
}

#[derive(Deserialize)]
struct DiagnosisBody {
    count: usize,
    photos: Vec<PhotoBody>,
}

async fn request_diagnosis(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    Json(body): Json<DiagnosisBody>,
) -> Response {
    let mut data = state.data.lock();
    if !data.hives.contains_key(&id) {
        return error(StatusCode::NOT_FOUND, "Beehive not found");
    }
    if body.count != body.photos.len() || body.count == 0 {
        return error(StatusCode::BAD_REQUEST, "Photo count mismatch");
    }

    let slots: Vec<Value> = body
        .photos
        .iter()
        .map(|p| {
            let status = if data.refused_uploads.contains(&p.filename) { 1 } else { 0 };
            json!({
                "filename": p.filename,
                "status": status,
                "preSignedUrl": format!("{}/upload/{}", state.base_url, p.filename),
            })
        })
        .collect();

    insert_diagnosis(&mut data, id, &fixtures::now_rfc3339());
    Json(Value::Array(slots)).into_response()
}

async fn annotated_images(
    State(state): State<MockState>,
    Path((id, diagnosis_id)): Path<(i64, i64)>,
) -> Response {
    let data = state.data.lock();
    let known = data
        .diagnoses
        .get(&id)
        .map(|list| list.iter().any(|d| d["diagnosisId"] == diagnosis_id))
        .unwrap_or(false);
    if !known {
        return error(StatusCode::NOT_FOUND, "Diagnosis not found");
    }
    Json(json!({
        "urls": [
            format!("{}/images/{}/{}/0.jpg", state.base_url, id, diagnosis_id),
            format!("{}/images/{}/{}/1.jpg", state.base_url, id, diagnosis_id),
        ]
    }))
    .into_response()
}

async fn presigned_put(
    State(state): State<MockState>,
    Path(filename): Path<String>,
    body: axum::body::Bytes,
) -> Response {
    let mut data = state.data.lock();
    if data.failing_puts.contains(&filename) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    data.upload_bodies.insert(filename.clone(), body.to_vec());
    data.uploads.push(filename);
    StatusCode::OK.into_response()
}

#[derive(Deserialize)]
struct PushTokenBody {
    token: String,
}

async fn register_push_token(State(state): State<MockState>, Json(body): Json<PushTokenBody>) -> Response {
    state.data.lock().push_tokens.push(body.token);
    StatusCode::OK.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_and_list() {
        let backend = MockBackend::start().await.unwrap();
        backend.seed_hive("A", 100.0, 200.0);
        let http = reqwest::Client::new();

        let unauthorized = http
            .get(format!("{}/api/v1/beehives", backend.base_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(unauthorized.status(), 401);

        let login: Value = http
            .post(format!("{}/api/v1/members/login", backend.base_url()))
            .json(&json!({ "memberLoginId": fixtures::TEST_LOGIN_ID, "password": fixtures::TEST_PASSWORD }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(login["accessToken"], fixtures::TEST_TOKEN);

        let hives: Vec<Value> = http
            .get(format!("{}/api/v1/beehives", backend.base_url()))
            .bearer_auth(fixtures::TEST_TOKEN)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(hives.len(), 1);
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let backend = MockBackend::start().await.unwrap();
        let http = reqwest::Client::new();
        let url = format!("{}/api/v1/members/login", backend.base_url());
        let body = json!({ "memberLoginId": fixtures::TEST_LOGIN_ID, "password": fixtures::TEST_PASSWORD });

        backend.fail_next(403);
        assert_eq!(http.post(&url).json(&body).send().await.unwrap().status(), 403);
        assert_eq!(http.post(&url).json(&body).send().await.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn test_hive_detail_filters_by_month() {
        let backend = MockBackend::start().await.unwrap();
        let id = backend.seed_hive("A", 100.0, 200.0);
        backend.seed_diagnosis(id, "2024-05-02T10:00:00+09:00");
        let june = backend.seed_diagnosis(id, "2024-06-13T10:00:00+09:00");
        let http = reqwest::Client::new();
        let url = format!("{}/api/v1/beehives/{}", backend.base_url(), id);

        let fetch = |month: Option<u32>| {
            let mut req = http.get(&url).bearer_auth(fixtures::TEST_TOKEN);
            if let Some(m) = month {
                req = req.query(&[("month", m)]);
            }
            async move { req.send().await.unwrap().json::<Value>().await.unwrap() }
        };

        let all = fetch(None).await;
        assert_eq!(all["diagnoses"].as_array().map(Vec::len), Some(2));

        let filtered = fetch(Some(6)).await;
        let diagnoses = filtered["diagnoses"].as_array().unwrap();
        assert_eq!(diagnoses.len(), 1);
        assert_eq!(diagnoses[0]["diagnosisId"], june);

        let empty = fetch(Some(1)).await;
        assert_eq!(empty["diagnoses"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_diagnosis_records_result() {
        let backend = MockBackend::start().await.unwrap();
        let id = backend.seed_hive("A", 100.0, 200.0);
        let diagnosis = backend.seed_diagnosis(id, "2024-06-13T10:00:00+09:00");

        let hive = backend.hive(id).unwrap();
        assert_eq!(hive["lastDiagnosisId"], diagnosis);
    }
}
