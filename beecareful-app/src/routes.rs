//! Screens of the app and their URL paths.

use beecareful_client::HiveId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Route {
    #[default]
    Beehives,
    Login,
    Signup,
    BeehiveDetail(HiveId),
    DiagnosisCreate(HiveId),
    DiagnosisResult(HiveId),
    Notifications,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Beehives => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::BeehiveDetail(id) => format!("/beehives/{id}"),
            Route::DiagnosisCreate(id) => format!("/diagnosis/create/{id}"),
            Route::DiagnosisResult(id) => format!("/diagnosis/result/{id}"),
            Route::Notifications => "/notifications".to_string(),
        }
    }

    /// Inverse of [`Route::path`]. Query strings and a trailing slash are ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Route::Beehives),
            ["login"] => Some(Route::Login),
            ["signup"] => Some(Route::Signup),
            ["notifications"] => Some(Route::Notifications),
            ["beehives", id] => id.parse().ok().map(Route::BeehiveDetail),
            ["diagnosis", "create", id] => id.parse().ok().map(Route::DiagnosisCreate),
            ["diagnosis", "result", id] => id.parse().ok().map(Route::DiagnosisResult),
            _ => None,
        }
    }

    /// Screens reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Signup)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
