use beecareful_client::{ApiError, ConfigError, FormError};
use beecareful_map::MapError;
use beecareful_notifications::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("notification store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Hive not found: {0}")]
    UnknownHive(i64),
}

impl AppError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AppError::Api(e) if e.is_auth_failure())
    }

    /// Form errors are shown next to their fields, not as a toast.
    pub fn is_inline(&self) -> bool {
        matches!(self, AppError::Form(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(e) => e.user_message(),
            AppError::Form(_) => "Please check the highlighted fields.".to_string(),
            AppError::Store(_) => "Could not access saved notifications.".to_string(),
            AppError::Map(_) | AppError::UnknownHive(_) => "That hive no longer exists.".to_string(),
            AppError::Config(_) => "Could not read the app settings.".to_string(),
        }
    }
}
