//! Patrol Routes

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Looped patrol waypoints with a dwell at each one
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatrolRoute {
    pub waypoints: Vec<Vec2>,
    pub index: usize,
    /// Seconds spent at each waypoint
    pub dwell: f32,
    pub wait_timer: f32,
}

/// What the patrol wants this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatrolStep {
    Walk(Vec2),
    Dwell,
    /// No waypoints
    Empty,
}

impl PatrolRoute {
    pub fn new(waypoints: Vec<Vec2>, dwell: f32) -> Self {
        Self {
            waypoints,
            index: 0,
            dwell,
            wait_timer: 0.0,
        }
    }

    pub fn current(&self) -> Option<Vec2> {
        self.waypoints.get(self.index).copied()
    }

    /// Advances the patrol from `position`. Reaching a waypoint starts the
    /// dwell and moves on to the next one, wrapping at the end.
    pub fn update(&mut self, position: Vec2, arrive_radius: f32, dt: f32) -> PatrolStep {
        if self.waypoints.is_empty() {
            return PatrolStep::Empty;
        }
        if self.wait_timer > 0.0 {
            self.wait_timer = (self.wait_timer - dt).max(0.0);
            return PatrolStep::Dwell;
        }
        self.index %= self.waypoints.len();
        let target = self.waypoints[self.index];
        if position.distance(target) <= arrive_radius {
            self.index = (self.index + 1) % self.waypoints.len();
            self.wait_timer = self.dwell;
            return PatrolStep::Dwell;
        }
        PatrolStep::Walk(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patrol_loops_with_dwell() {
        let mut route = PatrolRoute::new(vec![Vec2::ZERO, Vec2::new(100.0, 0.0)], 0.5);
        assert_eq!(route.update(Vec2::ZERO, 5.0, 0.1), PatrolStep::Dwell);
        assert_eq!(route.index, 1);
        for _ in 0..5 {
            assert_eq!(route.update(Vec2::ZERO, 5.0, 0.1), PatrolStep::Dwell);
        }
        assert_eq!(
            route.update(Vec2::ZERO, 5.0, 0.1),
            PatrolStep::Walk(Vec2::new(100.0, 0.0))
        );
        assert_eq!(route.update(Vec2::new(99.0, 0.0), 5.0, 0.1), PatrolStep::Dwell);
        assert_eq!(route.index, 0);
    }

    #[test]
    fn test_empty_route() {
        let mut route = PatrolRoute::new(Vec::new(), 1.0);
        assert_eq!(route.update(Vec2::ZERO, 5.0, 0.1), PatrolStep::Empty);
        assert_eq!(route.current(), None);
    }
}
