//! Corner Peeking
//!
//! While walking, an agent fans probe rays out to both sides of its heading.
//! A side where some probes hit geometry and others run clear is an opening,
//! the mouth of a corridor or a doorway, and is worth a quick glance.

use glam::Vec2;

use crate::geometry::{LevelGeometry, RayMask};

/// Direction of the first opening found, checking the left side first.
///
/// `angles_degrees` are offsets from `heading`, probed on each side out to
/// `probe_length`. The returned direction is the first clear probe on the
/// opening side.
pub fn detect_opening(
    geometry: &LevelGeometry,
    position: Vec2,
    heading: Vec2,
    probe_length: f32,
    angles_degrees: &[f32],
) -> Option<Vec2> {
    let heading = heading.try_normalize()?;
    for sign in [1.0_f32, -1.0] {
        let mut blocked = false;
        let mut first_clear = None;
        for angle in angles_degrees {
            let direction = Vec2::from_angle(sign * angle.to_radians()).rotate(heading);
            let end = position + direction * probe_length;
            if geometry.raycast(position, end, RayMask::All).is_some() {
                blocked = true;
            } else if first_clear.is_none() {
                first_clear = Some(direction);
            }
        }
        if blocked {
            if let Some(direction) = first_clear {
                return Some(direction);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Obstacle;

    const ANGLES: [f32; 3] = [30.0, 60.0, 90.0];

    #[test]
    fn test_open_ground_has_no_opening() {
        let geometry = LevelGeometry::new();
        assert_eq!(
            detect_opening(&geometry, Vec2::ZERO, Vec2::Y, 150.0, &ANGLES),
            None
        );
    }

    #[test]
    fn test_solid_wall_is_not_an_opening() {
        // Long wall on the left catches every left probe
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::wall(
            Vec2::new(-60.0, -200.0),
            Vec2::new(-40.0, 400.0),
        )]);
        assert_eq!(
            detect_opening(&geometry, Vec2::ZERO, Vec2::Y, 150.0, &ANGLES),
            None
        );
    }

    #[test]
    fn test_wall_ending_ahead_is_an_opening() {
        // Wall on the left stops short: the 90 degree probe hits it, the
        // 30 degree probe passes over its end
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::wall(
            Vec2::new(-60.0, -200.0),
            Vec2::new(-40.0, 20.0),
        )]);
        let opening = detect_opening(&geometry, Vec2::ZERO, Vec2::Y, 150.0, &ANGLES).unwrap();
        assert!(opening.x < 0.0);
        let expected = Vec2::from_angle(30f32.to_radians()).rotate(Vec2::Y);
        assert!((opening - expected).length() < 1e-5);
    }
}
