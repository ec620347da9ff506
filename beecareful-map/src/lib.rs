//! Hive map for BeeCareful: placement search on the 2000x2000 plane,
//! viewport math and the press/drag/pinch gesture machine.

pub mod collision;
pub mod controller;
pub mod geometry;
pub mod gesture;
pub mod position;
pub mod ticker;
pub mod viewport;

use parking_lot::Mutex;
use std::sync::Arc;

pub use collision::{adjust_for_collision, detect_collision, resolve_initial_collisions};
pub use controller::{MapController, MapError};
pub use geometry::{calculate_distance, HiveId, HiveMarker, Point, MIN_DISTANCE};
pub use gesture::{
    Clock, GestureState, MapEvent, PointerTarget, Release, SystemClock, VirtualClock, TICK_PERIOD,
};
pub use position::{
    find_center_position, find_empty_position, find_optimal_position,
    find_visible_empty_position, is_position_occupied, Placement, PlacementOrigin, VisibleArea,
};
pub use ticker::{spawn_ticker, TickerHandle};
pub use viewport::{ScreenPoint, Viewport};

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
