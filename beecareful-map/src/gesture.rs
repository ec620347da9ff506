//! Gesture states and the clock they are timed against.
//!
//! Long-press detection is a timeout transition (`Pressed` -> `Dragging`),
//! so the clock is injected: `SystemClock` in the app, `VirtualClock` in
//! tests.

use crate::geometry::{HiveId, Point};
use crate::viewport::ScreenPoint;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hold time that turns a press into a drag.
pub const LONG_PRESS: Duration = Duration::from_millis(1000);
/// Pointer travel that cancels a pending long press / starts a pan.
pub const MOVE_THRESHOLD: f64 = 10.0;
/// After a drag ends, clicks are ignored for this long.
pub const POST_DRAG_GRACE: Duration = Duration::from_millis(50);
/// Ctrl+wheel zoom events closer than this are dropped.
pub const WHEEL_THROTTLE: Duration = Duration::from_millis(50);
/// Per-event limit on the pinch scale ratio.
pub const PINCH_STEP_LIMIT: f64 = 1.2;
/// Auto-scroll timer period.
pub const TICK_PERIOD: Duration = Duration::from_millis(16);

/// Monotonic time source, measured from an arbitrary start.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Arc<Mutex<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Hive(HiveId),
    Background,
}

/// How a pointer sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Up,
    Cancel,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GestureState {
    Idle,
    /// Pointer is down on a hive; the long-press timer is pending.
    Pressed {
        hive: HiveId,
        at: ScreenPoint,
        since: Duration,
    },
    /// Long press confirmed; the hive follows the pointer.
    Dragging {
        hive: HiveId,
        /// Pointer position minus marker position, in screen pixels.
        offset: ScreenPoint,
        /// Where the hive was when the drag started.
        from: Point,
    },
    Pinching {
        start_distance: f64,
        start_scale: f64,
    },
    /// Single-finger pan of the background.
    Panning {
        start: ScreenPoint,
        last: ScreenPoint,
    },
}

impl GestureState {
    pub fn dragging_id(&self) -> Option<HiveId> {
        match self {
            GestureState::Dragging { hive, .. } => Some(*hive),
            _ => None,
        }
    }

    pub fn is_long_press(&self) -> bool {
        matches!(self, GestureState::Dragging { .. })
    }
}

/// Output of the controller, consumed by the view/app layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MapEvent {
    Tap(HiveId),
    DragStarted(HiveId),
    HiveMoved {
        hive: HiveId,
        position: Point,
        collision: bool,
    },
    DragEnded {
        hive: HiveId,
        position: Point,
    },
    /// Drag aborted by a pinch; the hive went back to `restored`.
    DragCancelled {
        hive: HiveId,
        restored: Point,
    },
    ZoomChanged(f64),
    Scrolled {
        scroll_left: f64,
        scroll_top: f64,
    },
}
