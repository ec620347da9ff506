//! BeeCareful application layer: one state snapshot, a pure reducer and
//! the flows that connect the map, the REST client and the notification
//! cache.

pub mod app;
pub mod error;
pub mod ledger;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use app::{BeeCareful, PendingMove};
pub use error::AppError;
pub use ledger::{PositionLedger, Revision, Settled};
pub use routes::Route;
pub use state::{reduce, Action, AppState, Mode, PushPermission, Toast, ToastKind};
pub use telemetry::init_tracing;
