/**
 * MAP INTERACTION CONTROLLER - pointer/touch input -> map state
 *
 * Owns the viewport (scroll + scale), the hive markers and the gesture
 * state machine:
 *
 *   Idle --down on hive--> Pressed --1000ms--> Dragging --up/cancel/leave--> Idle
 *   Pressed --up/cancel (before 1000ms)--> Idle + Tap
 *   any --two fingers--> Pinching --fewer than two--> Idle
 *   Idle --one finger on background--> Panning
 *
 * Every handler first fires due timers, so a caller that never ticks
 * still gets the long-press transition on the next input event.
 */

use crate::collision::{adjust_for_collision, detect_collision, resolve_initial_collisions};
use crate::geometry::{HiveId, HiveMarker, Point, DRAG_BOUNDS};
use crate::gesture::{
    Clock, GestureState, MapEvent, PointerTarget, Release, SystemClock, LONG_PRESS,
    MOVE_THRESHOLD, PINCH_STEP_LIMIT, POST_DRAG_GRACE, WHEEL_THROTTLE,
};
use crate::viewport::{AutoScroll, ScreenPoint, Viewport, MAX_SCALE, MIN_SCALE, RESET_CENTER, ZOOM_STEP};
use std::time::Duration;
use tracing::{debug, info};

/// Wheel delta to scale factor, as tuned for trackpads.
const WHEEL_ZOOM_FACTOR: f64 = 0.0005 * 7.0;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Unknown hive: {0}")]
    UnknownHive(HiveId),
}

pub struct MapController<C: Clock = SystemClock> {
    clock: C,
    viewport: Viewport,
    hives: Vec<HiveMarker>,
    state: GestureState,
    auto_scroll: AutoScroll,
    collision_detected: bool,
    drag_released_at: Option<Duration>,
    last_wheel_zoom: Option<Duration>,
}

impl MapController<SystemClock> {
    pub fn with_system_clock(viewport: Viewport) -> Self {
        Self::new(SystemClock::new(), viewport)
    }
}

impl<C: Clock> MapController<C> {
    pub fn new(clock: C, viewport: Viewport) -> Self {
        Self {
            clock,
            viewport,
            hives: Vec::new(),
            state: GestureState::Idle,
            auto_scroll: AutoScroll::default(),
            collision_detected: false,
            drag_released_at: None,
            last_wheel_zoom: None,
        }
    }

    /// Replaces the marker list (e.g. after a fetch) and separates overlaps.
    /// Returns the ids that were moved apart.
    pub fn load_hives(&mut self, hives: Vec<HiveMarker>) -> Vec<HiveId> {
        self.hives = hives;
        self.reset_gesture();
        let moved = resolve_initial_collisions(&mut self.hives);
        info!("map loaded {} hives ({} repositioned)", self.hives.len(), moved.len());
        moved
    }

    pub fn hives(&self) -> &[HiveMarker] {
        &self.hives
    }

    pub fn hive(&self, id: HiveId) -> Option<&HiveMarker> {
        self.hives.iter().find(|h| h.id == id)
    }

    pub fn upsert_hive(&mut self, marker: HiveMarker) {
        match self.hives.iter_mut().find(|h| h.id == marker.id) {
            Some(existing) => *existing = marker,
            None => self.hives.push(marker),
        }
    }

    pub fn remove_hive(&mut self, id: HiveId) -> bool {
        let before = self.hives.len();
        self.hives.retain(|h| h.id != id);
        let involved = match self.state {
            GestureState::Pressed { hive, .. } | GestureState::Dragging { hive, .. } => hive == id,
            _ => false,
        };
        if involved {
            self.reset_gesture();
        }
        self.hives.len() < before
    }

    pub fn set_hive_position(&mut self, id: HiveId, position: Point) -> Result<(), MapError> {
        let hive = self
            .hives
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or(MapError::UnknownHive(id))?;
        hive.position = position;
        Ok(())
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn scale(&self) -> f64 {
        self.viewport.scale
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn dragging_id(&self) -> Option<HiveId> {
        self.state.dragging_id()
    }

    pub fn is_long_press(&self) -> bool {
        self.state.is_long_press()
    }

    /// True while a press/drag is in progress and shortly after a drag ends.
    pub fn is_dragging(&self) -> bool {
        if matches!(self.state, GestureState::Pressed { .. } | GestureState::Dragging { .. }) {
            return true;
        }
        self.drag_released_at
            .map(|at| self.clock.now().saturating_sub(at) < POST_DRAG_GRACE)
            .unwrap_or(false)
    }

    pub fn collision_detected(&self) -> bool {
        self.collision_detected
    }

    pub fn auto_scroll(&self) -> AutoScroll {
        self.auto_scroll
    }

    /// Whether a click on `id` should open its status popup.
    pub fn should_open_popup(&self, id: HiveId) -> bool {
        self.hive(id).is_some()
            && !self.is_dragging()
            && !matches!(self.state, GestureState::Pinching { .. })
    }

    // ----- mouse / single pointer -----

    pub fn pointer_down(&mut self, target: PointerTarget, at: ScreenPoint) -> Vec<MapEvent> {
        let mut events = Vec::new();
        self.fire_due_timers(&mut events);

        match self.state {
            GestureState::Pinching { .. } => return events,
            GestureState::Dragging { .. } => self.finish(Release::Up, &mut events),
            _ => {}
        }

        self.collision_detected = false;
        self.state = match target {
            PointerTarget::Hive(hive) if self.hive(hive).is_some() => GestureState::Pressed {
                hive,
                at,
                since: self.clock.now(),
            },
            _ => GestureState::Idle,
        };
        events
    }

    pub fn pointer_move(&mut self, at: ScreenPoint) -> Vec<MapEvent> {
        let mut events = Vec::new();
        self.fire_due_timers(&mut events);

        match self.state {
            GestureState::Pressed { at: pressed_at, .. } => {
                if at.distance_to(&pressed_at) > MOVE_THRESHOLD {
                    debug!("press moved before long-press, cancelled");
                    self.state = GestureState::Idle;
                }
            }
            GestureState::Dragging { .. } => self.drag_to(at, &mut events),
            _ => {}
        }
        events
    }

    pub fn pointer_up(&mut self) -> Vec<MapEvent> {
        self.release(Release::Up)
    }

    pub fn pointer_cancel(&mut self) -> Vec<MapEvent> {
        self.release(Release::Cancel)
    }

    pub fn pointer_leave(&mut self) -> Vec<MapEvent> {
        self.release(Release::Leave)
    }

    pub fn release(&mut self, how: Release) -> Vec<MapEvent> {
        let mut events = Vec::new();
        self.fire_due_timers(&mut events);
        self.finish(how, &mut events);
        events
    }

    // ----- touch -----

    pub fn touch_start(&mut self, touches: &[ScreenPoint], target: PointerTarget) -> Vec<MapEvent> {
        let mut events = Vec::new();
        self.fire_due_timers(&mut events);

        match touches {
            [first, second, ..] => {
                self.cancel_drag(&mut events);
                self.state = GestureState::Pinching {
                    start_distance: first.distance_to(second),
                    start_scale: self.viewport.scale,
                };
            }
            [only] => match target {
                PointerTarget::Hive(_) => events.extend(self.pointer_down(target, *only)),
                PointerTarget::Background => {
                    if self.state == GestureState::Idle {
                        self.state = GestureState::Panning { start: *only, last: *only };
                    }
                }
            },
            [] => {}
        }
        events
    }

    pub fn touch_move(&mut self, touches: &[ScreenPoint]) -> Vec<MapEvent> {
        let mut events = Vec::new();
        self.fire_due_timers(&mut events);

        match (self.state, touches) {
            (GestureState::Pinching { start_distance, start_scale }, [first, second, ..]) => {
                if start_distance > 0.0 {
                    let ratio = (first.distance_to(second) / start_distance)
                        .clamp(1.0 / PINCH_STEP_LIMIT, PINCH_STEP_LIMIT);
                    let anchor = first.midpoint(second);
                    events.push(self.handle_zoom(start_scale * ratio, Some(anchor)));
                }
            }
            (GestureState::Dragging { .. }, [only]) => self.drag_to(*only, &mut events),
            (GestureState::Pressed { at, .. }, [only]) => {
                if only.distance_to(&at) > MOVE_THRESHOLD {
                    self.state = GestureState::Panning { start: at, last: at };
                    self.pan_to(*only, &mut events);
                }
            }
            (GestureState::Panning { .. }, [only]) => self.pan_to(*only, &mut events),
            _ => {}
        }
        events
    }

    /// `remaining` are the fingers still on the screen.
    pub fn touch_end(&mut self, remaining: &[ScreenPoint]) -> Vec<MapEvent> {
        let mut events = Vec::new();
        self.fire_due_timers(&mut events);

        if remaining.len() < 2 && matches!(self.state, GestureState::Pinching { .. }) {
            self.state = GestureState::Idle;
        }
        if remaining.is_empty() {
            self.finish(Release::Up, &mut events);
        }
        events
    }

    // ----- zoom -----

    pub fn handle_zoom(&mut self, target: f64, anchor: Option<ScreenPoint>) -> MapEvent {
        MapEvent::ZoomChanged(self.viewport.zoom_to(target, anchor))
    }

    /// Ctrl+wheel zoom around the pointer. Plain wheel events are left to
    /// native scrolling.
    pub fn wheel(&mut self, delta_y: f64, ctrl: bool, at: ScreenPoint) -> Option<MapEvent> {
        if !ctrl {
            return None;
        }

        let now = self.clock.now();
        if let Some(last) = self.last_wheel_zoom {
            if now.saturating_sub(last) < WHEEL_THROTTLE {
                self.last_wheel_zoom = Some(now);
                return None;
            }
        }
        self.last_wheel_zoom = Some(now);

        let target = self.viewport.scale * (1.0 - delta_y * WHEEL_ZOOM_FACTOR);
        Some(self.handle_zoom(target, Some(at)))
    }

    pub fn zoom_in(&mut self) -> MapEvent {
        let target = (self.viewport.scale * ZOOM_STEP).min(MAX_SCALE);
        self.handle_zoom(target, None)
    }

    pub fn zoom_out(&mut self) -> MapEvent {
        let target = (self.viewport.scale / ZOOM_STEP).max(MIN_SCALE);
        self.handle_zoom(target, None)
    }

    /// Back to scale 1, centred on the default apiary area.
    pub fn reset_view(&mut self) -> Vec<MapEvent> {
        let zoom = self.handle_zoom(1.0, None);
        self.viewport.center_on(RESET_CENTER);
        vec![zoom, self.scrolled()]
    }

    // ----- timer -----

    /// Called every `TICK_PERIOD`: fires long-press timeouts and applies
    /// auto-scroll to the dragged hive.
    pub fn tick(&mut self) -> Vec<MapEvent> {
        let mut events = Vec::new();
        self.fire_due_timers(&mut events);

        if let GestureState::Dragging { hive, .. } = self.state {
            if !self.auto_scroll.is_idle() {
                if let Some(current) = self.hive(hive).map(|h| h.position) {
                    let scale = self.viewport.scale;
                    let candidate = Point::new(
                        current.x + self.auto_scroll.dx / scale,
                        current.y + self.auto_scroll.dy / scale,
                    );
                    events.push(self.place_dragged(hive, candidate));
                }
                self.viewport.scroll_by(self.auto_scroll.dx, self.auto_scroll.dy);
                events.push(self.scrolled());
            }
        }
        events
    }

    // ----- internals -----

    fn fire_due_timers(&mut self, events: &mut Vec<MapEvent>) {
        if let GestureState::Pressed { hive, at, since } = self.state {
            if self.clock.now().saturating_sub(since) >= LONG_PRESS {
                self.start_drag(hive, at, events);
            }
        }
    }

    fn start_drag(&mut self, hive: HiveId, pressed_at: ScreenPoint, events: &mut Vec<MapEvent>) {
        let Some(from) = self.hive(hive).map(|h| h.position) else {
            self.state = GestureState::Idle;
            return;
        };

        let local = self.viewport.plane_to_local(from);
        let offset = ScreenPoint::new(
            pressed_at.x - local.x - self.viewport.origin.x,
            pressed_at.y - local.y - self.viewport.origin.y,
        );
        self.state = GestureState::Dragging { hive, offset, from };
        debug!("long press confirmed on hive {}", hive);
        events.push(MapEvent::DragStarted(hive));
    }

    fn drag_to(&mut self, at: ScreenPoint, events: &mut Vec<MapEvent>) {
        let GestureState::Dragging { hive, offset, .. } = self.state else {
            return;
        };
        self.auto_scroll = self.viewport.edge_scroll(at);
        let candidate = self
            .viewport
            .screen_to_plane(ScreenPoint::new(at.x - offset.x, at.y - offset.y));
        events.push(self.place_dragged(hive, candidate));
    }

    fn place_dragged(&mut self, hive: HiveId, candidate: Point) -> MapEvent {
        let clamped = DRAG_BOUNDS.clamp(candidate);
        let collision = detect_collision(&self.hives, hive, clamped);
        let adjusted = adjust_for_collision(&self.hives, hive, clamped);

        self.collision_detected = collision;
        if let Some(marker) = self.hives.iter_mut().find(|h| h.id == hive) {
            marker.position = adjusted;
        }
        MapEvent::HiveMoved { hive, position: adjusted, collision }
    }

    fn pan_to(&mut self, at: ScreenPoint, events: &mut Vec<MapEvent>) {
        let GestureState::Panning { start, last } = self.state else {
            return;
        };
        if at.distance_to(&start) > MOVE_THRESHOLD {
            self.viewport.scroll_by(last.x - at.x, last.y - at.y);
            events.push(self.scrolled());
        }
        self.state = GestureState::Panning { start, last: at };
    }

    fn finish(&mut self, how: Release, events: &mut Vec<MapEvent>) {
        match self.state {
            GestureState::Pressed { hive, .. } => {
                self.state = GestureState::Idle;
                if how != Release::Leave {
                    events.push(MapEvent::Tap(hive));
                }
            }
            GestureState::Dragging { hive, .. } => {
                let position = self.hive(hive).map(|h| h.position).unwrap_or_default();
                self.reset_gesture();
                self.drag_released_at = Some(self.clock.now());
                info!("hive {} dropped at ({:.1}, {:.1})", hive, position.x, position.y);
                events.push(MapEvent::DragEnded { hive, position });
            }
            GestureState::Panning { .. } => self.state = GestureState::Idle,
            GestureState::Pinching { .. } | GestureState::Idle => {}
        }
    }

    fn cancel_drag(&mut self, events: &mut Vec<MapEvent>) {
        if let GestureState::Dragging { hive, from, .. } = self.state {
            if let Some(marker) = self.hives.iter_mut().find(|h| h.id == hive) {
                marker.position = from;
            }
            events.push(MapEvent::DragCancelled { hive, restored: from });
        }
        self.reset_gesture();
    }

    fn reset_gesture(&mut self) {
        self.state = GestureState::Idle;
        self.auto_scroll = AutoScroll::default();
        self.collision_detected = false;
    }

    fn scrolled(&self) -> MapEvent {
        MapEvent::Scrolled {
            scroll_left: self.viewport.scroll_left,
            scroll_top: self.viewport.scroll_top,
        }
    }
}
