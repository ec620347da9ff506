/**
 * BEECAREFUL APP SERVICE - user flows over the client, map and notification cache
 *
 * Owns the REST client, the local notification cache, the map controller
 * and the `AppState` snapshot. Each flow calls the backend, feeds the
 * result into the map and dispatches actions to the reducer.
 *
 * Failures never stop the app: they become toasts, and a 401/403 also
 * clears the session and routes to Login.
 */

use crate::error::AppError;
use crate::ledger::{PositionLedger, Revision, Settled};
use crate::routes::Route;
use crate::state::{reduce, Action, AppState, Mode, PushPermission, ToastKind};
use beecareful_client::{
    diagnose, AnnotatedImages, ApiClient, ApiError, ClientConfig, DiagnosisId, Hive, HiveDetail, HiveForm,
    LoginForm, LoginRequest, Photo, SignupForm, SignupRequest, UpdateHiveRequest,
    UploadSlot,
};
use beecareful_map::{
    find_optimal_position, new_shared, spawn_ticker, Clock, HiveId, HiveMarker, MapController,
    MapEvent, Point, Shared, SystemClock, TickerHandle, Viewport, TICK_PERIOD,
};
use beecareful_notifications::{
    enrich_with_nicknames, JsonFileStore, Notification, NotificationCache, NotificationStore, PushPayload,
};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// A position write that has been issued but not yet answered.
#[derive(Debug, Clone)]
pub struct PendingMove {
    pub hive: HiveId,
    pub revision: Revision,
    pub position: Point,
    request: UpdateHiveRequest,
}

pub struct BeeCareful<S: NotificationStore = JsonFileStore, C: Clock = SystemClock> {
    api: ApiClient,
    notifications: NotificationCache<S>,
    map: Shared<MapController<C>>,
    ledger: Mutex<PositionLedger>,
    state: Mutex<AppState>,
    retention: Duration,
}

impl BeeCareful<JsonFileStore, SystemClock> {
    /// Wires the app from a loaded config: REST client with the configured
    /// token storage, notification file and a map sized to `viewport`.
    pub fn from_config(config: &ClientConfig, viewport: Viewport) -> Result<Self, AppError> {
        let api = ApiClient::from_config(config, config.session_store())?;
        let store = JsonFileStore::open(config.notifications_path()?)?;
        let map = MapController::with_system_clock(viewport);
        Ok(Self::new(api, store, map).with_retention(config.retention()))
    }
}

impl<S: NotificationStore, C: Clock + 'static> BeeCareful<S, C> {
    pub fn new(api: ApiClient, store: S, map: MapController<C>) -> Self {
        let state = AppState::new(api.is_logged_in());
        Self {
            api,
            notifications: NotificationCache::new(store),
            map: new_shared(map),
            ledger: Mutex::new(PositionLedger::new()),
            state: Mutex::new(state),
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn map(&self) -> Shared<MapController<C>> {
        self.map.clone()
    }

    pub fn notifications(&self) -> &NotificationCache<S> {
        &self.notifications
    }

    pub fn snapshot(&self) -> AppState {
        self.state.lock().clone()
    }

    pub fn dispatch(&self, action: Action) {
        let mut state = self.state.lock();
        *state = reduce(std::mem::take(&mut *state), action);
    }

    /// Starts the map timer (long press, auto-scroll).
    pub fn start_map_ticker(&self) -> (TickerHandle, mpsc::UnboundedReceiver<MapEvent>) {
        spawn_ticker(self.map.clone(), TICK_PERIOD)
    }

    fn toast(&self, kind: ToastKind, message: &str) {
        self.dispatch(Action::ShowToast {
            kind,
            message: message.to_string(),
        });
    }

    /// Turns a failure into user feedback and hands it back to the caller.
    fn report(&self, err: AppError) -> AppError {
        if err.is_inline() {
            return err;
        }
        if err.is_auth_failure() {
            warn!("session rejected by the backend, back to login");
            if let Err(e) = self.api.logout() {
                error!("failed to clear session: {}", e);
            }
            self.ledger.lock().clear();
            self.dispatch(Action::AuthLost);
        } else {
            error!("{}", err);
        }
        self.toast(ToastKind::Error, &err.user_message());
        err
    }

    fn guard<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        result.map_err(|e| self.report(e))
    }

    // ----- members -----

    pub async fn signup(&self, form: SignupForm) -> Result<(), AppError> {
        let request = SignupRequest::try_from(form)?;
        let result = self.api.signup(&request).await.map_err(AppError::from);
        self.guard(result)?;
        self.dispatch(Action::Navigate(Route::Login));
        self.toast(ToastKind::Success, "Sign-up complete. Please log in.");
        Ok(())
    }

    pub async fn login(&self, form: LoginForm) -> Result<(), AppError> {
        let request = LoginRequest::try_from(form)?;
        match self.api.login(&request).await {
            Ok(_) => {
                self.dispatch(Action::LoggedIn);
                Ok(())
            }
            // Bad credentials, not an expired session.
            Err(e @ ApiError::Unauthorized(_)) => {
                warn!("login rejected for {}", request.member_login_id);
                self.toast(ToastKind::Error, "Incorrect login ID or password.");
                Err(e.into())
            }
            Err(e) => Err(self.report(e.into())),
        }
    }

    pub fn logout(&self) -> Result<(), AppError> {
        let result = self.api.logout().map_err(AppError::from);
        self.guard(result)?;
        self.ledger.lock().clear();
        self.map.lock().load_hives(Vec::new());
        self.dispatch(Action::LoggedOut);
        Ok(())
    }

    // ----- hives -----

    /// Fetches the hive list, feeds it to the map and separates overlapping
    /// markers. Separation is local; the server keeps the stored positions.
    pub async fn load_hives(&self) -> Result<Vec<Hive>, AppError> {
        let result = self.api.list_hives().await.map_err(AppError::from);
        let mut hives = self.guard(result)?;

        {
            let mut ledger = self.ledger.lock();
            for hive in &hives {
                ledger.confirm(hive.beehive_id, Point::new(hive.x_direction, hive.y_direction));
            }
        }

        let markers: Vec<HiveMarker> = hives
            .iter()
            .map(|h| HiveMarker::new(h.beehive_id, h.x_direction, h.y_direction))
            .collect();

        {
            let mut map = self.map.lock();
            let moved = map.load_hives(markers);
            for id in moved {
                if let (Some(hive), Some(marker)) = (hives.iter_mut().find(|h| h.beehive_id == id), map.hive(id)) {
                    hive.x_direction = marker.position.x;
                    hive.y_direction = marker.position.y;
                }
            }
        }

        info!("loaded {} hives", hives.len());
        self.dispatch(Action::HivesLoaded(hives.clone()));
        Ok(hives)
    }

    /// Creates a hive at the best free spot of the current view.
    pub async fn add_hive(&self, form: HiveForm) -> Result<Hive, AppError> {
        let placement = {
            let map = self.map.lock();
            find_optimal_position(map.hives(), Some(map.viewport()))
        };
        if placement.is_fallback() {
            warn!("no free spot for the new hive, using {:?}", placement.point);
        }

        let request = form.into_create(placement.point.x, placement.point.y)?;
        let result = self.api.create_hive(&request).await.map_err(AppError::from);
        let created = self.guard(result)?;

        let hive = match created {
            Some(hive) => hive,
            // No body: find the new hive in a fresh listing.
            None => {
                let hives = self.load_hives().await?;
                hives
                    .into_iter()
                    .filter(|h| h.nickname == request.nickname)
                    .max_by_key(|h| h.beehive_id)
                    .ok_or(AppError::UnknownHive(0))
                    .map_err(|e| self.report(e))?
            }
        };

        self.map
            .lock()
            .upsert_hive(HiveMarker::new(hive.beehive_id, hive.x_direction, hive.y_direction));
        self.ledger
            .lock()
            .confirm(hive.beehive_id, Point::new(hive.x_direction, hive.y_direction));
        self.dispatch(Action::HiveAdded(hive.clone()));
        self.toast(ToastKind::Success, &format!("{} added.", hive.nickname));
        Ok(hive)
    }

    pub async fn hive_records(&self, id: HiveId, month: u32) -> Result<HiveDetail, AppError> {
        let result = self.api.hive_records(id, month).await.map_err(AppError::from);
        self.guard(result)
    }

    pub async fn rename_hive(&self, id: HiveId, form: HiveForm) -> Result<(), AppError> {
        let position = self.hive_position(id)?;
        let request = form.into_update(position.x, position.y)?;
        let result = self.api.update_hive(id, &request).await.map_err(AppError::from);
        self.guard(result)?;
        self.load_hives().await?;
        Ok(())
    }

    pub async fn delete_hive(&self, id: HiveId) -> Result<(), AppError> {
        let result = self.api.delete_hive(id).await.map_err(AppError::from);
        self.guard(result)?;
        self.map.lock().remove_hive(id);
        self.ledger.lock().forget(id);
        self.dispatch(Action::HiveRemoved(id));
        self.toast(ToastKind::Success, "Hive deleted.");
        Ok(())
    }

    pub async fn link_turret(&self, id: HiveId, code: &str) -> Result<(), AppError> {
        let result = self.api.link_turret(id, code).await.map_err(AppError::from);
        self.guard(result)?;
        self.toast(ToastKind::Success, "Turret linked.");
        Ok(())
    }

    fn hive_position(&self, id: HiveId) -> Result<Point, AppError> {
        self.map
            .lock()
            .hive(id)
            .map(|m| m.position)
            .ok_or(AppError::UnknownHive(id))
    }

    // ----- map -----

    /// Applies controller output: taps select, drags move the hive and a
    /// finished drag is written to the backend.
    pub async fn handle_map_events(&self, events: Vec<MapEvent>) {
        for event in events {
            match event {
                MapEvent::Tap(id) => self.dispatch(Action::SelectHive(Some(id))),
                MapEvent::HiveMoved { hive, position, .. } => self.dispatch(Action::HiveMoved {
                    id: hive,
                    x: position.x,
                    y: position.y,
                }),
                MapEvent::DragCancelled { hive, restored } => self.dispatch(Action::HiveMoved {
                    id: hive,
                    x: restored.x,
                    y: restored.y,
                }),
                MapEvent::DragEnded { hive, position } => {
                    // Failures are already reported as toasts.
                    let _ = self.persist_position(hive, position).await;
                }
                MapEvent::DragStarted(_) | MapEvent::ZoomChanged(_) | MapEvent::Scrolled { .. } => {}
            }
        }
    }

    pub async fn persist_position(&self, id: HiveId, position: Point) -> Result<Settled, AppError> {
        let pending = self.begin_move(id, position)?;
        let result = self.api.update_hive(id, &pending.request).await;
        self.finish_move(pending, result)
    }

    /// Issues a new revision for `id` and builds its update request.
    pub fn begin_move(&self, id: HiveId, position: Point) -> Result<PendingMove, AppError> {
        let nickname = self
            .state
            .lock()
            .hive(id)
            .map(|h| h.nickname.clone())
            .ok_or(AppError::UnknownHive(id))?;
        let revision = self.ledger.lock().issue(id);
        debug!("hive {} move to ({:.0}, {:.0}) as revision {}", id, position.x, position.y, revision);
        Ok(PendingMove {
            hive: id,
            revision,
            position,
            request: UpdateHiveRequest {
                nickname,
                x_direction: position.x,
                y_direction: position.y,
            },
        })
    }

    /// Applies the answer to a position write. Answers to superseded
    /// revisions are dropped. A failed newest write puts the hive back at
    /// its last confirmed position.
    pub fn finish_move(
        &self,
        pending: PendingMove,
        result: Result<(), ApiError>,
    ) -> Result<Settled, AppError> {
        let PendingMove { hive, revision, position, .. } = pending;
        match result {
            Ok(()) => {
                let settled = self.ledger.lock().settle_success(hive, revision, position);
                if settled == Settled::Latest {
                    self.dispatch(Action::HiveMoved { id: hive, x: position.x, y: position.y });
                }
                Ok(settled)
            }
            Err(e) => {
                let (settled, restore) = self.ledger.lock().settle_failure(hive, revision);
                if settled == Settled::Stale {
                    debug!("stale write of hive {} failed: {}", hive, e);
                    return Ok(settled);
                }
                if let Some(previous) = restore {
                    if self.map.lock().set_hive_position(hive, previous).is_ok() {
                        self.dispatch(Action::HiveMoved { id: hive, x: previous.x, y: previous.y });
                    }
                }
                Err(self.report(e.into()))
            }
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        self.dispatch(Action::SetMode(mode));
    }

    // ----- diagnosis -----

    /// Announces the photos, uploads them to their slots and opens the hive.
    pub async fn diagnose(&self, id: HiveId, photos: &[Photo]) -> Result<Vec<UploadSlot>, AppError> {
        let result = diagnose(&self.api, id, photos).await.map_err(AppError::from);
        let slots = self.guard(result)?;
        self.dispatch(Action::Navigate(Route::BeehiveDetail(id)));
        self.toast(
            ToastKind::Success,
            "Photos uploaded. You will be notified when the diagnosis is ready.",
        );
        Ok(slots)
    }

    pub async fn annotated_images(&self, id: HiveId, diagnosis: DiagnosisId) -> Result<AnnotatedImages, AppError> {
        let result = self.api.annotated_images(id, diagnosis).await.map_err(AppError::from);
        self.guard(result)
    }

    // ----- push -----

    pub fn set_push_permission(&self, permission: PushPermission) {
        if permission == PushPermission::Denied {
            info!("push permission denied, alerts stay local");
        }
        self.dispatch(Action::PushPermissionChanged(permission));
    }

    /// Sends the device token to the backend. Without a granted permission
    /// nothing is sent and `Ok(false)` is returned.
    pub async fn register_push_token(&self, token: &str) -> Result<bool, AppError> {
        if self.state.lock().push != PushPermission::Granted {
            debug!("push not granted, token not registered");
            return Ok(false);
        }
        let result = self.api.register_push_token(token).await.map_err(AppError::from);
        self.guard(result)?;
        Ok(true)
    }

    // ----- notifications -----

    /// Stores a delivered push message and refreshes the list.
    pub fn receive_push(&self, payload: &PushPayload) -> Result<Notification, AppError> {
        let result = self.notifications.ingest_push(payload).map_err(AppError::from);
        let notification = self.guard(result)?;
        self.refresh_notifications()?;
        Ok(notification)
    }

    /// Reloads the cache into the state, with hive nicknames filled in.
    pub fn refresh_notifications(&self) -> Result<Vec<Notification>, AppError> {
        let result = self.notifications.fetch_all().map_err(AppError::from);
        let mut all = self.guard(result)?;
        {
            let state = self.state.lock();
            enrich_with_nicknames(&mut all, |beehive_id| {
                let id: HiveId = beehive_id.parse().ok()?;
                state.hive(id).map(|h| h.nickname.clone())
            });
        }
        self.dispatch(Action::NotificationsLoaded(all.clone()));
        Ok(all)
    }

    pub fn mark_notification_read(&self, id: &str) -> Result<bool, AppError> {
        let result = self.notifications.mark_as_read(id).map_err(AppError::from);
        let found = self.guard(result)?;
        self.refresh_notifications()?;
        Ok(found)
    }

    pub fn mark_all_notifications_read(&self) -> Result<usize, AppError> {
        let result = self.notifications.mark_all_as_read().map_err(AppError::from);
        let changed = self.guard(result)?;
        self.refresh_notifications()?;
        Ok(changed)
    }

    pub fn delete_notification(&self, id: &str) -> Result<bool, AppError> {
        let result = self.notifications.delete(id).map_err(AppError::from);
        let removed = self.guard(result)?;
        self.refresh_notifications()?;
        Ok(removed)
    }

    /// Marks the notification read and opens the hive it is about.
    pub fn open_notification(&self, id: &str) -> Result<Option<Route>, AppError> {
        self.mark_notification_read(id)?;
        let route = self
            .snapshot()
            .notifications
            .iter()
            .find(|n| n.id == id)
            .and_then(|n| n.beehive_id())
            .and_then(|b| b.parse::<HiveId>().ok())
            .map(Route::BeehiveDetail);
        if let Some(route) = route {
            self.dispatch(Action::Navigate(route));
        }
        Ok(route)
    }

    pub fn purge_notifications(&self) -> Result<usize, AppError> {
        let result = self.notifications.purge_older_than(self.retention).map_err(AppError::from);
        let purged = self.guard(result)?;
        if purged > 0 {
            self.refresh_notifications()?;
        }
        Ok(purged)
    }
}
