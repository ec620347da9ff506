//! Single application state snapshot and its reducer.
//!
//! Views read an `AppState`; everything that changes it goes through
//! [`reduce`] as an [`Action`].

use crate::routes::Route;
use beecareful_client::{Hive, HiveId};
use beecareful_notifications::Notification;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mode {
    #[default]
    Normal,
    /// Picking the hive to diagnose.
    Diagnosis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PushPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppState {
    pub route: Route,
    pub mode: Mode,
    pub hives: Vec<Hive>,
    pub selected_hive: Option<HiveId>,
    pub toasts: Vec<Toast>,
    pub notifications: Vec<Notification>,
    pub unread: usize,
    pub push: PushPermission,
    pub logged_in: bool,
    next_toast_id: u64,
}

impl AppState {
    /// Fresh state; a restored session starts on the hive map.
    pub fn new(logged_in: bool) -> Self {
        AppState {
            logged_in,
            route: if logged_in { Route::Beehives } else { Route::Login },
            ..AppState::default()
        }
    }

    pub fn hive(&self, id: HiveId) -> Option<&Hive> {
        self.hives.iter().find(|h| h.beehive_id == id)
    }

    pub fn selected(&self) -> Option<&Hive> {
        self.selected_hive.and_then(|id| self.hive(id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(Route),
    LoggedIn,
    LoggedOut,
    /// The backend answered 401/403.
    AuthLost,
    SetMode(Mode),
    SelectHive(Option<HiveId>),
    /// Leaves diagnosis mode towards the photo screen of the selected hive.
    ConfirmDiagnosisSelection,
    HivesLoaded(Vec<Hive>),
    HiveAdded(Hive),
    HiveMoved { id: HiveId, x: f64, y: f64 },
    HiveRemoved(HiveId),
    ShowToast { kind: ToastKind, message: String },
    DismissToast(u64),
    NotificationsLoaded(Vec<Notification>),
    PushPermissionChanged(PushPermission),
}

pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::Navigate(route) => {
            state.route = route;
        }
        Action::LoggedIn => {
            state.logged_in = true;
            state.route = Route::Beehives;
        }
        Action::AuthLost | Action::LoggedOut => {
            state.logged_in = false;
            state.route = Route::Login;
            state.mode = Mode::Normal;
            state.selected_hive = None;
            state.hives.clear();
        }
        Action::SetMode(mode) => {
            state.mode = mode;
            if mode == Mode::Normal {
                state.selected_hive = None;
            }
        }
        Action::SelectHive(id) => {
            state.selected_hive = id.filter(|id| state.hives.iter().any(|h| h.beehive_id == *id));
        }
        Action::ConfirmDiagnosisSelection => match (state.mode, state.selected_hive) {
            (Mode::Diagnosis, Some(id)) => {
                state.route = Route::DiagnosisCreate(id);
                state.mode = Mode::Normal;
                state.selected_hive = None;
            }
            _ => {
                state = push_toast(state, ToastKind::Info, "Select a hive to diagnose first.");
            }
        },
        Action::HivesLoaded(hives) => {
            state.hives = hives;
            if let Some(id) = state.selected_hive {
                if state.hive(id).is_none() {
                    state.selected_hive = None;
                }
            }
        }
        Action::HiveAdded(hive) => {
            match state.hives.iter_mut().find(|h| h.beehive_id == hive.beehive_id) {
                Some(existing) => *existing = hive,
                None => state.hives.push(hive),
            }
        }
        Action::HiveMoved { id, x, y } => {
            if let Some(hive) = state.hives.iter_mut().find(|h| h.beehive_id == id) {
                hive.x_direction = x;
                hive.y_direction = y;
            }
        }
        Action::HiveRemoved(id) => {
            state.hives.retain(|h| h.beehive_id != id);
            if state.selected_hive == Some(id) {
                state.selected_hive = None;
            }
            if matches!(
                state.route,
                Route::BeehiveDetail(r) | Route::DiagnosisCreate(r) | Route::DiagnosisResult(r) if r == id
            ) {
                state.route = Route::Beehives;
            }
        }
        Action::ShowToast { kind, message } => {
            state = push_toast(state, kind, &message);
        }
        Action::DismissToast(id) => {
            state.toasts.retain(|t| t.id != id);
        }
        Action::NotificationsLoaded(notifications) => {
            state.unread = notifications.iter().filter(|n| !n.read).count();
            state.notifications = notifications;
        }
        Action::PushPermissionChanged(permission) => {
            state.push = permission;
        }
    }
    state
}

fn push_toast(mut state: AppState, kind: ToastKind, message: &str) -> AppState {
    state.next_toast_id += 1;
    state.toasts.push(Toast {
        id: state.next_toast_id,
        kind,
        message: message.to_string(),
    });
    state
}
