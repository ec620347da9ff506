//! Scrollable, zoomable window onto the plane.
//!
//! Screen points are client coordinates (the same space pointer events
//! report). `origin` is the top-left corner of the map container in that
//! space.

use crate::geometry::{Point, PLANE_HEIGHT, PLANE_WIDTH};
use crate::position::VisibleArea;
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;
/// Factor applied by the zoom in / zoom out buttons.
pub const ZOOM_STEP: f64 = 1.2;
/// Point the reset button centres on.
pub const RESET_CENTER: Point = Point::new(900.0, 900.0);

/// Distance from a container edge that triggers auto-scroll while dragging.
pub const AUTO_SCROLL_THRESHOLD: f64 = 50.0;
/// Pixels scrolled per tick while auto-scrolling.
pub const AUTO_SCROLL_SPEED: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &ScreenPoint) -> ScreenPoint {
        ScreenPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Per-tick scroll velocity, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AutoScroll {
    pub dx: f64,
    pub dy: f64,
}

impl AutoScroll {
    pub fn is_idle(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub origin: ScreenPoint,
    pub width: f64,
    pub height: f64,
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub scale: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            origin: ScreenPoint::default(),
            width,
            height,
            scroll_left: 0.0,
            scroll_top: 0.0,
            scale: 1.0,
        }
    }

    pub fn with_origin(mut self, left: f64, top: f64) -> Self {
        self.origin = ScreenPoint::new(left, top);
        self
    }

    /// NaN maps to `MIN_SCALE`.
    pub fn clamp_scale(scale: f64) -> f64 {
        if scale.is_nan() {
            return MIN_SCALE;
        }
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }

    pub fn screen_to_plane(&self, p: ScreenPoint) -> Point {
        Point {
            x: (p.x - self.origin.x + self.scroll_left) / self.scale,
            y: (p.y - self.origin.y + self.scroll_top) / self.scale,
        }
    }

    /// Position of a plane point relative to the container's top-left corner.
    pub fn plane_to_local(&self, p: Point) -> ScreenPoint {
        ScreenPoint {
            x: p.x * self.scale - self.scroll_left,
            y: p.y * self.scale - self.scroll_top,
        }
    }

    pub fn visible_area(&self) -> VisibleArea {
        VisibleArea {
            min_x: self.scroll_left / self.scale,
            max_x: (self.scroll_left + self.width) / self.scale,
            min_y: self.scroll_top / self.scale,
            max_y: (self.scroll_top + self.height) / self.scale,
            center: None,
        }
    }

    /// Plane coordinate under the centre of the container.
    pub fn map_center(&self) -> Point {
        Point {
            x: (self.scroll_left + self.width / 2.0) / self.scale,
            y: (self.scroll_top + self.height / 2.0) / self.scale,
        }
    }

    fn max_scroll(&self) -> (f64, f64) {
        (
            (PLANE_WIDTH * self.scale - self.width).max(0.0),
            (PLANE_HEIGHT * self.scale - self.height).max(0.0),
        )
    }

    pub fn set_scroll(&mut self, left: f64, top: f64) {
        let (max_left, max_top) = self.max_scroll();
        self.scroll_left = left.clamp(0.0, max_left);
        self.scroll_top = top.clamp(0.0, max_top);
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.set_scroll(self.scroll_left + dx, self.scroll_top + dy);
    }

    pub fn center_on(&mut self, p: Point) {
        self.set_scroll(
            p.x * self.scale - self.width / 2.0,
            p.y * self.scale - self.height / 2.0,
        );
    }

    /// Zoom so that `anchor` (default: container centre) stays put on screen.
    /// Returns the applied, clamped scale.
    pub fn zoom_to(&mut self, target: f64, anchor: Option<ScreenPoint>) -> f64 {
        // NaN would poison scale and scroll alike
        if target.is_nan() {
            return self.scale;
        }
        let (point_x, point_y) = match anchor {
            Some(a) if a.x.is_finite() && a.y.is_finite() => (a.x - self.origin.x, a.y - self.origin.y),
            _ => (self.width / 2.0, self.height / 2.0),
        };

        let plane_x = (self.scroll_left + point_x) / self.scale;
        let plane_y = (self.scroll_top + point_y) / self.scale;

        let clamped = Self::clamp_scale(target);
        self.scale = clamped;
        self.set_scroll(plane_x * clamped - point_x, plane_y * clamped - point_y);
        clamped
    }

    /// Auto-scroll velocity for a pointer at `at`.
    pub fn edge_scroll(&self, at: ScreenPoint) -> AutoScroll {
        let left = self.origin.x;
        let top = self.origin.y;
        let right = left + self.width;
        let bottom = top + self.height;

        let dx = if at.x - left < AUTO_SCROLL_THRESHOLD {
            -AUTO_SCROLL_SPEED
        } else if right - at.x < AUTO_SCROLL_THRESHOLD {
            AUTO_SCROLL_SPEED
        } else {
            0.0
        };
        let dy = if at.y - top < AUTO_SCROLL_THRESHOLD {
            -AUTO_SCROLL_SPEED
        } else if bottom - at.y < AUTO_SCROLL_THRESHOLD {
            AUTO_SCROLL_SPEED
        } else {
            0.0
        };

        AutoScroll { dx, dy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(400.0, 800.0).with_origin(10.0, 60.0);
        vp.set_scroll(500.0, 500.0);
        vp
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = viewport();
        assert_eq!(vp.zoom_to(10.0, None), MAX_SCALE);
        assert_eq!(vp.zoom_to(0.01, None), MIN_SCALE);
        assert_eq!(vp.zoom_to(-3.0, None), MIN_SCALE);
        assert_eq!(vp.zoom_to(1.3, None), 1.3);
    }

    #[test]
    fn test_zoom_ignores_nan_and_clamps_infinity() {
        let mut vp = viewport();
        vp.zoom_to(1.5, None);
        let scroll = (vp.scroll_left, vp.scroll_top);

        assert_eq!(vp.zoom_to(f64::NAN, None), 1.5);
        assert_eq!(vp.scale, 1.5);
        assert_eq!((vp.scroll_left, vp.scroll_top), scroll);

        assert_eq!(vp.zoom_to(f64::INFINITY, None), MAX_SCALE);
        assert_eq!(vp.zoom_to(f64::NEG_INFINITY, None), MIN_SCALE);
        assert!(vp.scroll_left.is_finite() && vp.scroll_top.is_finite());

        vp.zoom_to(1.0, Some(ScreenPoint::new(f64::NAN, 10.0)));
        assert!(vp.scroll_left.is_finite() && vp.scroll_top.is_finite());
        assert_eq!(Viewport::clamp_scale(f64::NAN), MIN_SCALE);
    }

    #[test]
    fn test_zoom_keeps_anchor_stationary() {
        let mut vp = viewport();
        let anchor = ScreenPoint::new(150.0, 300.0);
        let before = vp.screen_to_plane(anchor);

        vp.zoom_to(2.0, Some(anchor));
        let after = vp.screen_to_plane(anchor);

        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_defaults_to_centre() {
        let mut vp = viewport();
        let before = vp.map_center();
        vp.zoom_to(1.5, None);
        let after = vp.map_center();
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_visible_area_follows_scale() {
        let mut vp = Viewport::new(400.0, 800.0);
        vp.scale = 2.0;
        vp.set_scroll(200.0, 400.0);
        let area = vp.visible_area();
        assert_eq!(area.min_x, 100.0);
        assert_eq!(area.max_x, 300.0);
        assert_eq!(area.min_y, 200.0);
        assert_eq!(area.max_y, 600.0);
    }

    #[test]
    fn test_scroll_never_negative() {
        let mut vp = Viewport::new(400.0, 800.0);
        vp.center_on(Point::new(10.0, 10.0));
        assert_eq!(vp.scroll_left, 0.0);
        assert_eq!(vp.scroll_top, 0.0);
    }

    #[test]
    fn test_edge_scroll() {
        let vp = Viewport::new(400.0, 800.0);
        assert_eq!(vp.edge_scroll(ScreenPoint::new(20.0, 400.0)), AutoScroll { dx: -10.0, dy: 0.0 });
        assert_eq!(vp.edge_scroll(ScreenPoint::new(390.0, 790.0)), AutoScroll { dx: 10.0, dy: 10.0 });
        assert!(vp.edge_scroll(ScreenPoint::new(200.0, 400.0)).is_idle());
    }
}
