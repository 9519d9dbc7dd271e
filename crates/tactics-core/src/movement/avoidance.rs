//! Wall Avoidance
//!
//! Short probes ahead and to either side push the desired direction away
//! from nearby walls. Only used when no cover route is available.

use glam::Vec2;

use crate::config::AvoidanceConfig;
use crate::geometry::{LevelGeometry, RayMask};

/// Steers `desired` away from walls around `position`. Returns a unit
/// vector, or zero for a zero `desired`.
pub fn avoid_walls(geometry: &LevelGeometry, position: Vec2, desired: Vec2, config: &AvoidanceConfig) -> Vec2 {
    let Some(heading) = desired.try_normalize() else {
        return Vec2::ZERO;
    };
    let side = config.side_angle_degrees.to_radians();
    let probes = [
        (heading, config.forward_probe),
        (Vec2::from_angle(side).rotate(heading), config.side_probe),
        (Vec2::from_angle(-side).rotate(heading), config.side_probe),
    ];

    let mut push = Vec2::ZERO;
    for (direction, length) in probes {
        if length <= 0.0 {
            continue;
        }
        if let Some(hit) = geometry.raycast(position, position + direction * length, RayMask::All) {
            push += hit.normal * (1.0 - hit.distance / length).max(0.0);
        }
    }

    (heading + push * config.weight)
        .try_normalize()
        .unwrap_or_else(|| heading.perp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Obstacle;

    #[test]
    fn test_open_ground_keeps_heading() {
        let geometry = LevelGeometry::new();
        let steer = avoid_walls(&geometry, Vec2::ZERO, Vec2::new(0.0, 5.0), &AvoidanceConfig::default());
        assert!((steer - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn test_wall_ahead_turns_away() {
        // Wall face at y = 30, slightly to the right of the heading
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::wall(
            Vec2::new(-5.0, 30.0),
            Vec2::new(200.0, 50.0),
        )]);
        let steer = avoid_walls(&geometry, Vec2::ZERO, Vec2::Y, &AvoidanceConfig::default());
        assert!((steer.length() - 1.0).abs() < 1e-5);
        assert!(steer.y < 1.0);
    }

    #[test]
    fn test_zero_desired() {
        let geometry = LevelGeometry::new();
        assert_eq!(
            avoid_walls(&geometry, Vec2::ZERO, Vec2::ZERO, &AvoidanceConfig::default()),
            Vec2::ZERO
        );
    }
}
