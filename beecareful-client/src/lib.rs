//! BeeCareful remote data access: REST client, upload flow, forms,
//! session storage and configuration.

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod phone;
pub mod report;
pub mod session;
pub mod upload;

pub use api::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use forms::{FormError, HiveForm, LoginForm, SignupForm};
pub use models::*;
pub use phone::{format_phone_number, strip_phone_hyphens};
pub use report::{Condition, DiagnosisBreakdown, Slice};
pub use session::{KeyringSessionStore, MemorySessionStore, SessionError, SessionStore};
pub use upload::{diagnose, upload_photos, Photo, MAX_UPLOAD_IMAGE_COUNT};
