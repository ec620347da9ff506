/**
 * API CLIENT - typed access to the BeeCareful REST backend
 *
 * Every call goes through `send`, which attaches the bearer token from the
 * session store and maps non-2xx statuses to `ApiError`:
 *   401/403 -> Unauthorized (caller sends the user back to login)
 *   409/400 -> Conflict/BadRequest with the server's `message`
 */

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{
    AnnotatedImages, CreateHiveRequest, DiagnosisId, DiagnosisRequest, Hive, HiveDetail, HiveId,
    LoginRequest, LoginResponse, PhotoMetadata, PushTokenRequest, SignupRequest,
    TurretLinkRequest, UpdateHiveRequest, UploadSlot,
};
use crate::session::SessionStore;
use crate::upload::MAX_UPLOAD_IMAGE_COUNT;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT, session)
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &ClientConfig, session: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        Self::with_timeout(&config.api.base_url, config.timeout(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.session.load(), Ok(Some(_)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        Ok(match self.session.load()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorized(builder)?.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status, &body);
        if err.is_auth_failure() {
            warn!("request rejected with {}, session no longer valid", status);
        } else {
            debug!("request failed with {}: {}", status, body);
        }
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(builder).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    // ----- members -----

    /// `POST /api/v1/members`
    pub async fn signup(&self, request: &SignupRequest) -> Result<(), ApiError> {
        self.send(self.http.post(self.url("/api/v1/members")).json(request)).await?;
        info!("member {} signed up", request.member_login_id);
        Ok(())
    }

    /// `POST /api/v1/members/login`. Stores and returns the access token.
    pub async fn login(&self, request: &LoginRequest) -> Result<String, ApiError> {
        let response = self
            .send(self.http.post(self.url("/api/v1/members/login")).json(request))
            .await?;

        let header_token = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_start_matches("Bearer ").trim().to_string())
            .filter(|t| !t.is_empty());

        let body = response.text().await?;
        let body_token = serde_json::from_str::<LoginResponse>(&body)
            .ok()
            .and_then(LoginResponse::into_token);

        let token = body_token
            .or(header_token)
            .ok_or_else(|| ApiError::Decode("login response carried no token".to_string()))?;

        self.session.save(&token)?;
        info!("member {} logged in", request.member_login_id);
        Ok(token)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.clear()?;
        info!("session cleared");
        Ok(())
    }

    // ----- beehives -----

    /// `GET /api/v1/beehives`
    pub async fn list_hives(&self) -> Result<Vec<Hive>, ApiError> {
        let hives: Vec<Hive> = self.send_json(self.http.get(self.url("/api/v1/beehives"))).await?;
        debug!("fetched {} hives", hives.len());
        Ok(hives)
    }

    /// `POST /api/v1/beehives`. Returns the created hive when the backend
    /// echoes it.
    pub async fn create_hive(&self, request: &CreateHiveRequest) -> Result<Option<Hive>, ApiError> {
        let body = self
            .send(self.http.post(self.url("/api/v1/beehives")).json(request))
            .await?
            .text()
            .await?;
        info!(
            "hive '{}' created at ({:.1}, {:.1})",
            request.nickname, request.x_direction, request.y_direction
        );
        Ok(serde_json::from_str(&body).ok())
    }

    /// `GET /api/v1/beehives/:id?month=`
    pub async fn hive_records(&self, id: HiveId, month: u32) -> Result<HiveDetail, ApiError> {
        let request = self
            .http
            .get(self.url(&format!("/api/v1/beehives/{id}")))
            .query(&[("month", month)]);
        self.send_json(request).await
    }

    /// `PATCH /api/v1/beehives/:id`
    pub async fn update_hive(&self, id: HiveId, request: &UpdateHiveRequest) -> Result<(), ApiError> {
        self.send(self.http.patch(self.url(&format!("/api/v1/beehives/{id}"))).json(request))
            .await?;
        debug!("hive {} updated", id);
        Ok(())
    }

    /// `DELETE /api/v1/beehives/:id`
    pub async fn delete_hive(&self, id: HiveId) -> Result<(), ApiError> {
        self.send(self.http.delete(self.url(&format!("/api/v1/beehives/{id}"))))
            .await?;
        info!("hive {} deleted", id);
        Ok(())
    }

    /// `POST /api/v1/beehives/:id/turret`
    pub async fn link_turret(&self, id: HiveId, code: &str) -> Result<(), ApiError> {
        let body = TurretLinkRequest { code: code.to_string() };
        self.send(self.http.post(self.url(&format!("/api/v1/beehives/{id}/turret"))).json(&body))
            .await?;
        info!("turret linked to hive {}", id);
        Ok(())
    }

    // ----- diagnosis -----

    /// `POST /api/v1/beehives/:id/diagnosis`: announces the photos and gets
    /// one pre-signed upload slot per file.
    pub async fn request_diagnosis(
        &self,
        id: HiveId,
        photos: &[PhotoMetadata],
    ) -> Result<Vec<UploadSlot>, ApiError> {
        if photos.len() > MAX_UPLOAD_IMAGE_COUNT {
            return Err(ApiError::TooManyPhotos(photos.len()));
        }
        let body = DiagnosisRequest {
            count: photos.len(),
            photos: photos.to_vec(),
        };
        let slots: Vec<UploadSlot> = self
            .send_json(self.http.post(self.url(&format!("/api/v1/beehives/{id}/diagnosis"))).json(&body))
            .await?;
        debug!("diagnosis for hive {}: {} upload slots", id, slots.len());
        Ok(slots)
    }

    /// `GET /api/v1/beehives/:id/diagnoses/:diagnosisId/annotated-images`
    pub async fn annotated_images(
        &self,
        id: HiveId,
        diagnosis_id: DiagnosisId,
    ) -> Result<AnnotatedImages, ApiError> {
        let path = format!("/api/v1/beehives/{id}/diagnoses/{diagnosis_id}/annotated-images");
        self.send_json(self.http.get(self.url(&path))).await
    }

    /// PUT to a pre-signed URL. No bearer token: the URL is the credential.
    pub async fn put_presigned(&self, url: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), ApiError> {
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_response(status, &body))
        }
    }

    // ----- push -----

    /// `POST /users/fcm-token`
    pub async fn register_push_token(&self, token: &str) -> Result<(), ApiError> {
        let body = PushTokenRequest { token: token.to_string() };
        self.send(self.http.post(self.url("/users/fcm-token")).json(&body)).await?;
        info!("push token registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use beecareful_devkit::{fixtures, MockBackend};

    async fn client(backend: &MockBackend) -> (ApiClient, Arc<MemorySessionStore>) {
        let session = Arc::new(MemorySessionStore::new());
        let client = ApiClient::new(&backend.base_url(), session.clone()).unwrap();
        (client, session)
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            member_login_id: fixtures::TEST_LOGIN_ID.to_string(),
            password: fixtures::TEST_PASSWORD.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let backend = MockBackend::start().await.unwrap();
        let (client, session) = client(&backend).await;

        let token = client.login(&login_request()).await.unwrap();
        assert_eq!(token, fixtures::TEST_TOKEN);
        assert_eq!(session.load().unwrap().as_deref(), Some(fixtures::TEST_TOKEN));
        assert!(client.is_logged_in());

        client.logout().unwrap();
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let backend = MockBackend::start().await.unwrap();
        let (client, session) = client(&backend).await;

        let err = client
            .login(&LoginRequest {
                member_login_id: fixtures::TEST_LOGIN_ID.to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(session.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_signup_is_conflict() {
        let backend = MockBackend::start().await.unwrap();
        let (client, _) = client(&backend).await;

        let request = SignupRequest {
            member_login_id: fixtures::TEST_LOGIN_ID.to_string(),
            password: "password1!".to_string(),
            member_name: "Kim".to_string(),
            phone: "01012345678".to_string(),
        };
        let err = client.signup(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(!err.user_message().is_empty());
    }

    #[tokio::test]
    async fn test_hive_crud() {
        let backend = MockBackend::start().await.unwrap();
        let (client, _) = client(&backend).await;
        client.login(&login_request()).await.unwrap();

        let created = client
            .create_hive(&CreateHiveRequest {
                nickname: "North".to_string(),
                x_direction: 1000.0,
                y_direction: 1000.0,
            })
            .await
            .unwrap()
            .unwrap();

        let hives = client.list_hives().await.unwrap();
        assert!(hives.iter().any(|h| h.beehive_id == created.beehive_id));

        client
            .update_hive(
                created.beehive_id,
                &UpdateHiveRequest {
                    nickname: "North".to_string(),
                    x_direction: 1300.0,
                    y_direction: 900.0,
                },
            )
            .await
            .unwrap();
        let moved = client
            .list_hives()
            .await
            .unwrap()
            .into_iter()
            .find(|h| h.beehive_id == created.beehive_id)
            .unwrap();
        assert_eq!(moved.x_direction, 1300.0);

        client.delete_hive(created.beehive_id).await.unwrap();
        let err = client.delete_hive(created.beehive_id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn test_calls_without_token_are_rejected() {
        let backend = MockBackend::start().await.unwrap();
        let (client, _) = client(&backend).await;

        let err = client.list_hives().await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MockBackend::start().await.unwrap();
        let (client, _) = client(&backend).await;
        client.login(&login_request()).await.unwrap();

        backend.fail_next(500);
        let err = client.list_hives().await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, .. }));

        // next call goes through again
        assert!(client.list_hives().await.is_ok());
    }

    #[tokio::test]
    async fn test_hive_records_and_turret() {
        let backend = MockBackend::start().await.unwrap();
        let (client, _) = client(&backend).await;
        client.login(&login_request()).await.unwrap();
        let id = backend.seed_hive("South", 500.0, 500.0);

        client.link_turret(id, "TURRET-01").await.unwrap();
        let detail = client.hive_records(id, 6).await.unwrap();
        assert_eq!(detail.nickname, "South");
        assert!(detail.has_turret());

        let requests = backend.requests();
        assert!(requests.iter().any(|r| r.path == format!("/api/v1/beehives/{id}") && r.query.as_deref() == Some("month=6")));
    }

    #[tokio::test]
    async fn test_too_many_photos_rejected_locally() {
        let backend = MockBackend::start().await.unwrap();
        let (client, _) = client(&backend).await;

        let photos: Vec<PhotoMetadata> = (0..11)
            .map(|i| PhotoMetadata {
                filename: format!("p{i}.jpg"),
                content_type: "image/jpeg".to_string(),
                expected_size: 10,
            })
            .collect();
        let err = client.request_diagnosis(1, &photos).await.unwrap_err();
        assert!(matches!(err, ApiError::TooManyPhotos(11)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_register_push_token() {
        let backend = MockBackend::start().await.unwrap();
        let (client, _) = client(&backend).await;
        client.login(&login_request()).await.unwrap();

        client.register_push_token("fcm-token-1").await.unwrap();
        assert_eq!(backend.push_tokens(), vec!["fcm-token-1".to_string()]);
    }
}
