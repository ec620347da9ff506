//! Plane geometry shared by placement and gestures.
//!
//! Hives live on a bounded 2000x2000 plane. Screen coordinates are only
//! turned into plane coordinates through [`crate::viewport::Viewport`].

use serde::{Deserialize, Serialize};

/// Backend identifier of a beehive.
pub type HiveId = i64;

pub const PLANE_WIDTH: f64 = 2000.0;
pub const PLANE_HEIGHT: f64 = 2000.0;

/// Rendered side length of a hive marker, in plane units.
pub const HIVE_SIZE: f64 = 100.0;

/// Minimum spacing between two hives: marker size (100) + margin (20).
pub const MIN_DISTANCE: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        calculate_distance(self.x, self.y, other.x, other.y)
    }
}

/// Euclidean distance between two plane points.
pub fn calculate_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

/// Axis-aligned rectangle on the plane, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub const fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self { min_x, max_x, min_y, max_y }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn clamp(&self, p: Point) -> Point {
        Point {
            x: p.x.clamp(self.min_x, self.max_x),
            y: p.y.clamp(self.min_y, self.max_y),
        }
    }
}

/// Area the placement search may return points in.
pub const PLACEMENT_BOUNDS: Bounds = Bounds::new(100.0, 1900.0, 100.0, 1900.0);

/// Area a dragged marker is kept inside.
pub const DRAG_BOUNDS: Bounds = Bounds::new(
    HIVE_SIZE,
    PLANE_WIDTH - HIVE_SIZE,
    HIVE_SIZE,
    PLANE_HEIGHT - HIVE_SIZE,
);

/// A hive as the map sees it: identity + position, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HiveMarker {
    pub id: HiveId,
    pub position: Point,
}

impl HiveMarker {
    pub const fn new(id: HiveId, x: f64, y: f64) -> Self {
        Self { id, position: Point::new(x, y) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_distance() {
        assert_eq!(calculate_distance(0.0, 0.0, 3.0, 4.0), 5.0);
        assert_eq!(calculate_distance(1.0, 1.0, 4.0, 5.0), 5.0);
        assert_eq!(calculate_distance(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(calculate_distance(1.0, 2.0, 1.0, 2.0), 0.0);
        assert_eq!(calculate_distance(1.0, 1.0, 1.0, 2.0), 1.0);
    }

    #[test]
    fn test_bounds_clamp_and_contains() {
        assert!(PLACEMENT_BOUNDS.contains(Point::new(100.0, 1900.0)));
        assert!(!PLACEMENT_BOUNDS.contains(Point::new(99.9, 500.0)));

        let clamped = DRAG_BOUNDS.clamp(Point::new(-50.0, 2500.0));
        assert_eq!(clamped, Point::new(HIVE_SIZE, PLANE_HEIGHT - HIVE_SIZE));
    }
}
