use crate::geometry::{HiveId, HiveMarker, Point, DRAG_BOUNDS, MIN_DISTANCE};
use crate::position::is_position_occupied;
use std::collections::HashMap;
use tracing::debug;

const MAX_RESOLVE_ITERATIONS: usize = 10;

/// True when `p` is too close to a hive other than `id`.
pub fn detect_collision(hives: &[HiveMarker], id: HiveId, p: Point) -> bool {
    is_position_occupied(p.x, p.y, hives, Some(id))
}

/// Pushes `p` out to exactly `MIN_DISTANCE` from the first hive it overlaps,
/// along the line joining their centres.
pub fn adjust_for_collision(hives: &[HiveMarker], id: HiveId, p: Point) -> Point {
    for other in hives.iter().filter(|h| h.id != id) {
        if other.position.distance_to(&p) < MIN_DISTANCE {
            let angle = (p.y - other.position.y).atan2(p.x - other.position.x);
            return Point {
                x: other.position.x + angle.cos() * MIN_DISTANCE,
                y: other.position.y + angle.sin() * MIN_DISTANCE,
            };
        }
    }
    p
}

/// Separates overlapping hives of a freshly loaded list.
///
/// Each pass moves both hives of every overlapping pair apart by half the
/// overlap. Stops when no pair overlaps or after 10 passes. Returns the ids
/// whose position changed.
pub fn resolve_initial_collisions(hives: &mut [HiveMarker]) -> Vec<HiveId> {
    let mut moved: Vec<HiveId> = Vec::new();
    if hives.len() < 2 {
        return moved;
    }

    for iteration in 0..MAX_RESOLVE_ITERATIONS {
        let mut new_positions: HashMap<HiveId, Point> = HashMap::new();

        for i in 0..hives.len() {
            for j in (i + 1)..hives.len() {
                let a = hives[i];
                let b = hives[j];
                let distance = a.position.distance_to(&b.position);
                if distance >= MIN_DISTANCE {
                    continue;
                }

                let angle = (b.position.y - a.position.y).atan2(b.position.x - a.position.x);
                let shift = (MIN_DISTANCE - distance) / 2.0;
                let (dx, dy) = (angle.cos() * shift, angle.sin() * shift);

                let base_a = new_positions.get(&a.id).copied().unwrap_or(a.position);
                let base_b = new_positions.get(&b.id).copied().unwrap_or(b.position);

                new_positions.insert(a.id, DRAG_BOUNDS.clamp(Point::new(base_a.x - dx, base_a.y - dy)));
                new_positions.insert(b.id, DRAG_BOUNDS.clamp(Point::new(base_b.x + dx, base_b.y + dy)));
            }
        }

        if new_positions.is_empty() {
            debug!("initial collisions resolved after {} passes", iteration);
            break;
        }

        for hive in hives.iter_mut() {
            if let Some(p) = new_positions.get(&hive.id) {
                hive.position = *p;
                if !moved.contains(&hive.id) {
                    moved.push(hive.id);
                }
            }
        }
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_collision_ignores_self() {
        let hives = vec![HiveMarker::new(1, 500.0, 500.0), HiveMarker::new(2, 800.0, 500.0)];
        assert!(!detect_collision(&hives, 1, Point::new(510.0, 500.0)));
        assert!(detect_collision(&hives, 1, Point::new(750.0, 500.0)));
    }

    #[test]
    fn test_adjust_pushes_to_min_distance() {
        let hives = vec![HiveMarker::new(1, 500.0, 500.0), HiveMarker::new(2, 800.0, 500.0)];
        let adjusted = adjust_for_collision(&hives, 1, Point::new(750.0, 500.0));
        assert!((adjusted.x - 680.0).abs() < 1e-9);
        assert!((adjusted.y - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_adjust_leaves_free_point() {
        let hives = vec![HiveMarker::new(2, 800.0, 500.0)];
        let p = Point::new(300.0, 300.0);
        assert_eq!(adjust_for_collision(&hives, 1, p), p);
    }

    #[test]
    fn test_resolve_initial_collisions_separates_pair() {
        let mut hives = vec![HiveMarker::new(1, 1000.0, 1000.0), HiveMarker::new(2, 1060.0, 1000.0)];
        let moved = resolve_initial_collisions(&mut hives);

        assert_eq!(moved.len(), 2);
        let distance = hives[0].position.distance_to(&hives[1].position);
        assert!(distance >= MIN_DISTANCE - 1e-9);
        assert!((hives[0].position.x - 970.0).abs() < 1e-9);
        assert!((hives[1].position.x - 1090.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_leaves_spaced_hives() {
        let mut hives = vec![HiveMarker::new(1, 300.0, 300.0), HiveMarker::new(2, 600.0, 300.0)];
        assert!(resolve_initial_collisions(&mut hives).is_empty());
        assert_eq!(hives[0].position, Point::new(300.0, 300.0));
    }
}
