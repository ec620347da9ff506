/**
 * POSITION ENGINE - placement of new hives on the plane
 *
 * Two searches:
 * - spiral: outward square spiral from a requested point, bounded to the
 *   placement area, up to MAX_SPIRAL_STEPS candidates
 * - visible: radial scan (12 angles, growing radius) inside the current
 *   viewport, then the spiral from the viewport centre
 *
 * Occupancy is a linear distance scan. Hive counts per apiary are small.
 */

use crate::geometry::{
    calculate_distance, HiveId, HiveMarker, Point, MIN_DISTANCE, PLACEMENT_BOUNDS,
};
use crate::viewport::Viewport;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Distance between two spiral/radial candidates.
pub const SEARCH_STEP: f64 = MIN_DISTANCE * 1.2;
pub const MAX_SPIRAL_STEPS: usize = 2000;
pub const PLANE_CENTER: Point = Point::new(1000.0, 1000.0);

const FALLBACK_SPREAD: f64 = 100.0;
const RADIAL_ANGLES: usize = 12;
const RADIAL_ANGLE_STEP_DEG: f64 = 30.0;

/// Which search produced a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementOrigin {
    /// The requested point was already free.
    Requested,
    Spiral,
    Visible,
    /// Nothing free was found; the point is random and may overlap.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub point: Point,
    pub origin: PlacementOrigin,
}

impl Placement {
    fn new(point: Point, origin: PlacementOrigin) -> Self {
        Self { point, origin }
    }

    /// True when the minimum-distance guarantee does not hold for this point.
    pub fn is_fallback(&self) -> bool {
        self.origin == PlacementOrigin::Fallback
    }
}

/// Plane rectangle currently shown on screen, with an optional explicit centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleArea {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub center: Option<Point>,
}

impl VisibleArea {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center_point(&self) -> Point {
        self.center.unwrap_or(Point {
            x: (self.min_x + self.max_x) / 2.0,
            y: (self.min_y + self.max_y) / 2.0,
        })
    }
}

/// True iff a hive other than `exclude` sits closer than `MIN_DISTANCE` to `(x, y)`.
pub fn is_position_occupied(x: f64, y: f64, hives: &[HiveMarker], exclude: Option<HiveId>) -> bool {
    hives.iter().any(|hive| {
        if exclude == Some(hive.id) {
            return false;
        }
        calculate_distance(hive.position.x, hive.position.y, x, y) < MIN_DISTANCE
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    fn advance(self, p: Point, step: f64) -> Point {
        match self {
            Direction::Right => Point::new(p.x + step, p.y),
            Direction::Down => Point::new(p.x, p.y + step),
            Direction::Left => Point::new(p.x - step, p.y),
            Direction::Up => Point::new(p.x, p.y - step),
        }
    }

    fn turn(self) -> Self {
        match self {
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::Up => Direction::Right,
        }
    }
}

/// Spiral search from `start`. See [`find_empty_position_with`].
pub fn find_empty_position(hives: &[HiveMarker], start: Point) -> Placement {
    find_empty_position_with(hives, start, &mut rand::thread_rng())
}

/// Spiral search with an explicit random source for the fallback point.
pub fn find_empty_position_with<R: Rng + ?Sized>(
    hives: &[HiveMarker],
    start: Point,
    rng: &mut R,
) -> Placement {
    if !is_position_occupied(start.x, start.y, hives, None) {
        return Placement::new(start, PlacementOrigin::Requested);
    }

    let mut p = start;
    let mut direction = Direction::Right;
    let mut segment_length = 1usize;
    let mut segment_passed = 0usize;

    for _ in 0..MAX_SPIRAL_STEPS {
        p = direction.advance(p, SEARCH_STEP);
        segment_passed += 1;

        if segment_passed == segment_length {
            segment_passed = 0;
            direction = direction.turn();
            // every horizontal leg starts a longer wedge
            if matches!(direction, Direction::Right | Direction::Left) {
                segment_length += 1;
            }
        }

        if !PLACEMENT_BOUNDS.contains(p) {
            continue;
        }

        if !is_position_occupied(p.x, p.y, hives, None) {
            debug!("spiral placement found at ({:.1}, {:.1})", p.x, p.y);
            return Placement::new(p, PlacementOrigin::Spiral);
        }
    }

    let fallback = Point::new(
        PLANE_CENTER.x + rng.gen_range(-FALLBACK_SPREAD..FALLBACK_SPREAD),
        PLANE_CENTER.y + rng.gen_range(-FALLBACK_SPREAD..FALLBACK_SPREAD),
    );
    warn!(
        "no free slot after {} spiral steps, falling back to ({:.1}, {:.1})",
        MAX_SPIRAL_STEPS, fallback.x, fallback.y
    );
    Placement::new(fallback, PlacementOrigin::Fallback)
}

/// Radial search restricted to `area`, then the spiral from the area centre.
pub fn find_visible_empty_position(hives: &[HiveMarker], area: VisibleArea) -> Placement {
    let center = area.center_point();
    let width = area.width();
    let height = area.height();

    if width < SEARCH_STEP * 3.0 || height < SEARCH_STEP * 3.0 {
        return find_empty_position(hives, center);
    }

    if !is_position_occupied(center.x, center.y, hives, None) {
        return Placement::new(center, PlacementOrigin::Requested);
    }

    // candidates must keep one search step away from the screen edges
    let start_x = area.min_x + SEARCH_STEP;
    let end_x = area.max_x - SEARCH_STEP;
    let start_y = area.min_y + SEARCH_STEP;
    let end_y = area.max_y - SEARCH_STEP;
    let max_radius = width.max(height) / 2.0;

    let mut radius = SEARCH_STEP;
    while radius <= max_radius {
        for i in 0..RADIAL_ANGLES {
            let radian = (i as f64 * RADIAL_ANGLE_STEP_DEG).to_radians();
            let x = center.x + radius * radian.cos();
            let y = center.y + radius * radian.sin();

            if x >= start_x
                && x <= end_x
                && y >= start_y
                && y <= end_y
                && !is_position_occupied(x, y, hives, None)
            {
                return Placement::new(Point::new(x, y), PlacementOrigin::Visible);
            }
        }
        radius += SEARCH_STEP;
    }

    find_empty_position(hives, center)
}

/// Free point nearest the plane centre.
pub fn find_center_position(hives: &[HiveMarker]) -> Placement {
    find_empty_position(hives, PLANE_CENTER)
}

/// Best point for a new hive: inside the viewport when there is one.
pub fn find_optimal_position(hives: &[HiveMarker], viewport: Option<&Viewport>) -> Placement {
    let Some(viewport) = viewport else {
        return find_center_position(hives);
    };

    let mut area = viewport.visible_area();
    area.center = Some(area.center_point());

    let placement = find_visible_empty_position(hives, area);
    if is_position_occupied(placement.point.x, placement.point.y, hives, None) {
        return find_center_position(hives);
    }
    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scenario_hives() -> Vec<HiveMarker> {
        vec![
            HiveMarker::new(1, 0.0, 0.0),
            HiveMarker::new(2, 130.0, 0.0),
            HiveMarker::new(3, 3000.0, 0.0),
            HiveMarker::new(4, 3000.0, 130.0),
        ]
    }

    #[test]
    fn test_is_position_occupied() {
        let hives = scenario_hives();
        assert!(is_position_occupied(0.0, 0.0, &hives, None));
        assert!(is_position_occupied(249.0, 0.0, &hives, None));
        assert!(!is_position_occupied(250.0, 0.0, &hives, None));
        assert!(is_position_occupied(3000.0, 249.0, &hives, None));
        assert!(!is_position_occupied(3000.0, 250.0, &hives, None));
    }

    #[test]
    fn test_is_position_occupied_excludes_self() {
        let hives = vec![HiveMarker::new(7, 500.0, 500.0)];
        assert!(is_position_occupied(510.0, 500.0, &hives, None));
        assert!(!is_position_occupied(510.0, 500.0, &hives, Some(7)));
    }

    #[test]
    fn test_find_empty_position_scenario() {
        let hives = scenario_hives();
        for start in [PLANE_CENTER, Point::new(500.0, 0.0), Point::new(0.0, 500.0), Point::new(500.0, 500.0)] {
            let placement = find_empty_position(&hives, start);
            assert!(!is_position_occupied(placement.point.x, placement.point.y, &hives, None));
        }
    }

    #[test]
    fn test_requested_point_returned_when_free() {
        let placement = find_empty_position(&scenario_hives(), Point::new(500.0, 500.0));
        assert_eq!(placement.origin, PlacementOrigin::Requested);
        assert_eq!(placement.point, Point::new(500.0, 500.0));
    }

    #[test]
    fn test_spiral_first_step_goes_right() {
        let hives = vec![HiveMarker::new(1, 1000.0, 1000.0)];
        let placement = find_empty_position(&hives, PLANE_CENTER);
        assert_eq!(placement.origin, PlacementOrigin::Spiral);
        assert_eq!(placement.point, Point::new(1000.0 + SEARCH_STEP, 1000.0));
    }

    #[test]
    fn test_spiral_keeps_points_apart() {
        let mut hives: Vec<HiveMarker> = Vec::new();
        for id in 0..40 {
            let placement = find_empty_position(&hives, PLANE_CENTER);
            assert!(!placement.is_fallback());
            for other in &hives {
                assert!(other.position.distance_to(&placement.point) >= MIN_DISTANCE);
            }
            hives.push(HiveMarker { id, position: placement.point });
        }
    }

    #[test]
    fn test_spiral_skips_out_of_bounds_candidates() {
        let hives = vec![HiveMarker::new(1, 1850.0, 1850.0)];
        let placement = find_empty_position(&hives, Point::new(1850.0, 1850.0));
        assert!(PLACEMENT_BOUNDS.contains(placement.point));
        assert!(!is_position_occupied(placement.point.x, placement.point.y, &hives, None));
    }

    #[test]
    fn test_fallback_when_plane_is_full() {
        // grid dense enough that no spiral candidate is free
        let mut hives = Vec::new();
        let mut id = 0;
        let mut y = 0.0;
        while y <= 2100.0 {
            let mut x = 0.0;
            while x <= 2100.0 {
                hives.push(HiveMarker::new(id, x, y));
                id += 1;
                x += 100.0;
            }
            y += 100.0;
        }

        let mut rng = StdRng::seed_from_u64(7);
        let placement = find_empty_position_with(&hives, PLANE_CENTER, &mut rng);
        assert!(placement.is_fallback());
        assert!((placement.point.x - PLANE_CENTER.x).abs() <= FALLBACK_SPREAD);
        assert!((placement.point.y - PLANE_CENTER.y).abs() <= FALLBACK_SPREAD);
    }

    #[test]
    fn test_visible_search_stays_in_area() {
        let area = VisibleArea { min_x: 400.0, max_x: 1200.0, min_y: 400.0, max_y: 1200.0, center: None };
        let hives = vec![HiveMarker::new(1, 800.0, 800.0)];
        let placement = find_visible_empty_position(&hives, area);

        assert_eq!(placement.origin, PlacementOrigin::Visible);
        assert!(placement.point.x >= area.min_x + SEARCH_STEP && placement.point.x <= area.max_x - SEARCH_STEP);
        assert!(placement.point.y >= area.min_y + SEARCH_STEP && placement.point.y <= area.max_y - SEARCH_STEP);
        assert!(!is_position_occupied(placement.point.x, placement.point.y, &hives, None));
    }

    #[test]
    fn test_visible_search_small_area_uses_spiral() {
        let area = VisibleArea { min_x: 900.0, max_x: 1100.0, min_y: 900.0, max_y: 1100.0, center: None };
        let hives = vec![HiveMarker::new(1, 1000.0, 1000.0)];
        let placement = find_visible_empty_position(&hives, area);
        assert_eq!(placement.origin, PlacementOrigin::Spiral);
    }

    #[test]
    fn test_optimal_position_without_viewport_uses_centre() {
        let placement = find_optimal_position(&[], None);
        assert_eq!(placement.point, PLANE_CENTER);
    }

    #[test]
    fn test_optimal_position_in_viewport() {
        let mut viewport = Viewport::new(600.0, 600.0);
        viewport.scroll_left = 200.0;
        viewport.scroll_top = 200.0;
        let hives = vec![HiveMarker::new(1, 500.0, 500.0)];
        let placement = find_optimal_position(&hives, Some(&viewport));

        assert!(!is_position_occupied(placement.point.x, placement.point.y, &hives, None));
        let area = viewport.visible_area();
        assert!(placement.point.x >= area.min_x && placement.point.x <= area.max_x);
    }
}
