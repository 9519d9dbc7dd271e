//! Flank Targets
//!
//! A flank swings the agent around the player by a fixed angle at a fixed
//! distance. The side is picked once on entry and kept for the whole flank.

use glam::Vec2;

use crate::config::FlankConfig;
use crate::controller::FlankSide;
use crate::geometry::LevelGeometry;

/// A chosen flank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlankChoice {
    pub side: FlankSide,
    pub target: Vec2,
}

/// Flank point on `side`: the agent's bearing from the player rotated by
/// `angle_degrees`, scaled to `distance`. An agent standing on the player
/// uses +X as its bearing.
pub fn flank_point(player: Vec2, agent: Vec2, side: FlankSide, angle_degrees: f32, distance: f32) -> Vec2 {
    let bearing = (agent - player).try_normalize().unwrap_or(Vec2::X);
    let rotation = Vec2::from_angle(side.sign() * angle_degrees.to_radians());
    player + rotation.rotate(bearing) * distance
}

/// Picks the flank side around `player`.
///
/// A side qualifies when its point is not inside geometry. Among those,
/// reachable sides (clear straight path from the agent) come first, then
/// the nearer point, then `Left`. `None` when neither point is free.
pub fn choose_side(
    geometry: Option<&LevelGeometry>,
    agent: Vec2,
    player: Vec2,
    body_radius: f32,
    config: &FlankConfig,
) -> Option<FlankChoice> {
    let mut options: Vec<(bool, f32, FlankSide, Vec2)> = [FlankSide::Left, FlankSide::Right]
        .into_iter()
        .map(|side| {
            let target = flank_point(player, agent, side, config.angle_degrees, config.distance);
            (side, target)
        })
        .filter(|(_, target)| geometry.map_or(true, |g| g.point_free(*target, body_radius)))
        .map(|(side, target)| {
            let reachable = geometry.map_or(true, |g| g.path_clear(agent, target, body_radius));
            (!reachable, agent.distance(target), side, target)
        })
        .collect();

    options.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.total_cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });
    options
        .first()
        .map(|&(_, _, side, target)| FlankChoice { side, target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Obstacle;

    #[test]
    fn test_flank_point_rotates_bearing() {
        let left = flank_point(Vec2::ZERO, Vec2::new(0.0, -300.0), FlankSide::Left, 90.0, 200.0);
        assert!((left - Vec2::new(200.0, 0.0)).length() < 1e-3);
        let right = flank_point(Vec2::ZERO, Vec2::new(0.0, -300.0), FlankSide::Right, 90.0, 200.0);
        assert!((right - Vec2::new(-200.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_flank_point_keeps_distance() {
        let point = flank_point(
            Vec2::new(50.0, 50.0),
            Vec2::new(400.0, -20.0),
            FlankSide::Right,
            60.0,
            200.0,
        );
        assert!((point.distance(Vec2::new(50.0, 50.0)) - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_open_ground_prefers_nearer_side() {
        // Symmetric bearing: both sides are equally far, Left wins the tie
        let choice = choose_side(None, Vec2::new(0.0, -300.0), Vec2::ZERO, 14.0, &FlankConfig::default())
            .unwrap();
        assert_eq!(choice.side, FlankSide::Left);
    }

    #[test]
    fn test_blocked_side_is_skipped() {
        let config = FlankConfig::default();
        let agent = Vec2::new(0.0, -300.0);
        let left = flank_point(Vec2::ZERO, agent, FlankSide::Left, config.angle_degrees, config.distance);
        // Bury the left flank point in a crate
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::wall(
            left - Vec2::splat(30.0),
            left + Vec2::splat(30.0),
        )]);
        let choice = choose_side(Some(&geometry), agent, Vec2::ZERO, 14.0, &config).unwrap();
        assert_eq!(choice.side, FlankSide::Right);
        assert!(geometry.point_free(choice.target, 14.0));
    }

    #[test]
    fn test_no_free_side() {
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::wall(
            Vec2::splat(-500.0),
            Vec2::splat(500.0),
        )]);
        let choice = choose_side(
            Some(&geometry),
            Vec2::new(0.0, -300.0),
            Vec2::ZERO,
            14.0,
            &FlankConfig::default(),
        );
        assert_eq!(choice, None);
    }
}
