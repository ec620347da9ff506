use crate::session::SessionError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized (HTTP {0})")]
    Unauthorized(u16),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Upload of {filename} failed: {reason}")]
    Upload { filename: String, reason: String },
    #[error("Too many photos: {0} (max {max})", max = crate::upload::MAX_UPLOAD_IMAGE_COUNT)]
    TooManyPhotos(usize),
    #[error("Session storage error: {0}")]
    Session(#[from] SessionError),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Maps a non-success response to an error, keeping the server's
    /// `message` field when the body carries one.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_default();

        match status.as_u16() {
            401 | 403 => ApiError::Unauthorized(status.as_u16()),
            404 => ApiError::NotFound,
            409 => ApiError::Conflict(message),
            400 => ApiError::BadRequest(message),
            code => ApiError::Server { status: code, message },
        }
    }

    /// 401/403: the session is gone and the user must log in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Text shown to the user in a toast.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(_) => "Your session has expired. Please log in again.".to_string(),
            ApiError::Conflict(msg) | ApiError::BadRequest(msg) if !msg.is_empty() => msg.clone(),
            ApiError::Conflict(_) => "This entry already exists.".to_string(),
            ApiError::BadRequest(_) => "The request was invalid.".to_string(),
            ApiError::NotFound => "The requested item could not be found.".to_string(),
            ApiError::Server { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Server { .. } => "Something went wrong. Please try again.".to_string(),
            ApiError::Network(_) => "Network error. Check your connection and try again.".to_string(),
            ApiError::Decode(_) => "Unexpected response from the server.".to_string(),
            ApiError::Upload { .. } => "Image upload failed. Please try again.".to_string(),
            ApiError::TooManyPhotos(_) => format!(
                "You can upload up to {} photos at once.",
                crate::upload::MAX_UPLOAD_IMAGE_COUNT
            ),
            ApiError::Session(_) => "Could not access the saved session.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(ApiError::from_response(StatusCode::UNAUTHORIZED, "").is_auth_failure());
        assert!(ApiError::from_response(StatusCode::FORBIDDEN, "").is_auth_failure());
        assert!(matches!(ApiError::from_response(StatusCode::NOT_FOUND, ""), ApiError::NotFound));
        assert!(matches!(
            ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            ApiError::Server { status: 500, .. }
        ));
    }

    #[test]
    fn test_server_message_is_kept() {
        let err = ApiError::from_response(StatusCode::CONFLICT, r#"{"message":"Username already taken"}"#);
        assert!(matches!(&err, ApiError::Conflict(m) if m == "Username already taken"));
        assert_eq!(err.user_message(), "Username already taken");
    }

    #[test]
    fn test_fallback_message_without_body() {
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, "not json");
        assert_eq!(err.user_message(), "The request was invalid.");
        assert!(!err.is_auth_failure());
    }
}
