//! Sign-up, login and hive forms.
//!
//! Field rules mirror what the backend accepts. A form converts into its
//! request type through `TryFrom`; on failure `FormError::Invalid` carries
//! one message per offending field, for inline display.

use crate::models::{CreateHiveRequest, LoginRequest, SignupRequest, UpdateHiveRequest};
use crate::phone::strip_phone_hyphens;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

static LOGIN_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]+$").expect("login id regex"));
static PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Za-z0-9!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]+$"#).expect("password regex")
});
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[가-힣a-zA-Z]+$").expect("name regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}-[0-9]{3,4}-[0-9]{4}$").expect("phone regex"));

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Form validation failed: {}", summarize(.0))]
    Invalid(BTreeMap<String, String>),
}

impl FormError {
    /// First message for `field`, if that field failed.
    pub fn field(&self, field: &str) -> Option<&str> {
        match self {
            FormError::Invalid(fields) => fields.get(field).map(String::as_str),
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        match self {
            FormError::Invalid(fields) => fields,
        }
    }
}

fn summarize(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ValidationErrors> for FormError {
    fn from(value: ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        for (field, errors) in value.field_errors() {
            if let Some(first) = errors.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                fields.insert(field.to_string(), message);
            }
        }
        FormError::Invalid(fields)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(
        length(min = 4, message = "Login ID must be at least 4 characters"),
        regex(path = *LOGIN_ID_RE, message = "Login ID may only contain lowercase letters and digits")
    )]
    pub username: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        regex(path = *PASSWORD_RE, message = "Password may only contain letters, digits and symbols")
    )]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,
    #[validate(
        length(min = 1, message = "Please enter your name"),
        regex(path = *NAME_RE, message = "Name may only contain Hangul or Latin letters")
    )]
    pub name: String,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number (e.g. 010-1234-5678)"))]
    pub phone: String,
}

impl TryFrom<SignupForm> for SignupRequest {
    type Error = FormError;

    fn try_from(form: SignupForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(SignupRequest {
            member_login_id: form.username,
            password: form.password,
            member_name: form.name,
            phone: strip_phone_hyphens(&form.phone),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Please enter your login ID"))]
    pub username: String,
    #[validate(length(min = 1, message = "Please enter your password"))]
    pub password: String,
}

impl TryFrom<LoginForm> for LoginRequest {
    type Error = FormError;

    fn try_from(form: LoginForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(LoginRequest {
            member_login_id: form.username,
            password: form.password,
        })
    }
}

/// Nickname entered when adding or renaming a hive.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct HiveForm {
    #[validate(length(min = 1, max = 50, message = "Please enter a hive name"))]
    pub nickname: String,
}

impl HiveForm {
    pub fn new(nickname: &str) -> Self {
        Self {
            nickname: nickname.trim().to_string(),
        }
    }

    pub fn into_create(self, x: f64, y: f64) -> Result<CreateHiveRequest, FormError> {
        self.validate()?;
        Ok(CreateHiveRequest {
            nickname: self.nickname,
            x_direction: x,
            y_direction: y,
        })
    }

    pub fn into_update(self, x: f64, y: f64) -> Result<UpdateHiveRequest, FormError> {
        self.validate()?;
        Ok(UpdateHiveRequest {
            nickname: self.nickname,
            x_direction: x,
            y_direction: y,
        })
    }
}
