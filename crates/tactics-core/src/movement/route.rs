//! Cover-to-Cover Stepping
//!
//! Agents travel straight when the way is clear and otherwise hop between
//! reachable cover points toward their destination. Each cover hop ends in
//! a short settle pause before the next hop is chosen. Pursuit, flanking,
//! retreat and patrol all move through this one stepper.

use bevy_ecs::prelude::*;
use glam::Vec2;

use crate::config::{CoverConfig, MovementConfig};
use crate::geometry::LevelGeometry;
use crate::movement::cover::{rank_cover, CoverPoint, CoverQuery};

/// Hops remembered per route so the agent does not bounce between two points
pub const VISITED_HOPS: usize = 8;

/// Active route of one agent
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct Navigation {
    /// Point the agent is currently walking to in a straight line
    pub waypoint: Option<Vec2>,
    /// Final destination of the route
    pub destination: Option<Vec2>,
    /// Pause left after arriving at a cover hop
    pub settle_timer: f32,
    /// Heading the idle scan sweeps around
    pub rest_heading: Vec2,
    /// Cover hops already reached on this route
    visited: Vec<Vec2>,
}

/// What the stepper wants the agent to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Walk straight toward `waypoint`; the path has just been checked clear
    Move { waypoint: Vec2, direction: Vec2 },
    /// Hold still after a hop
    Settle,
    /// At the destination, or no destination
    Arrived,
    /// No clear straight line and no usable cover hop
    Blocked,
}

/// Next waypoint from `from` toward `destination`.
///
/// The destination itself when the swept path is clear. Otherwise a
/// reachable cover point, searched within the normal radius and then the
/// extended one, preferring in turn:
///
/// 1. a point with a clear line to the destination,
/// 2. a point at least `min_progress` closer to the destination,
/// 3. failing both, the reachable point nearest the destination.
///
/// Points in `avoid` and points right next to `from` are never chosen.
/// `threat` defaults to the destination.
pub fn next_hop(
    geometry: &LevelGeometry,
    from: Vec2,
    destination: Vec2,
    threat: Option<Vec2>,
    body_radius: f32,
    config: &CoverConfig,
    avoid: &[Vec2],
) -> Option<Vec2> {
    if geometry.path_clear(from, destination, body_radius) {
        return Some(destination);
    }

    let remaining = from.distance(destination);
    let usable = |point: &CoverPoint| {
        point.position.distance(from) > config.min_progress
            && avoid
                .iter()
                .all(|seen| seen.distance(point.position) > config.min_progress)
    };

    let mut widest = Vec::new();
    for radius in [config.search_radius, config.extended_radius] {
        let query = CoverQuery {
            origin: from,
            threat: threat.unwrap_or(destination),
            goal: destination,
            radius,
            body_radius,
        };
        let ranked: Vec<CoverPoint> = rank_cover(geometry, &query, config)
            .into_iter()
            .filter(usable)
            .collect();

        if let Some(exit) = ranked
            .iter()
            .find(|point| geometry.path_clear(point.position, destination, body_radius))
        {
            return Some(exit.position);
        }
        if let Some(closer) = ranked
            .iter()
            .find(|point| point.position.distance(destination) < remaining - config.min_progress)
        {
            return Some(closer.position);
        }
        widest = ranked;
    }

    widest
        .iter()
        .min_by(|a, b| {
            a.position
                .distance(destination)
                .total_cmp(&b.position.distance(destination))
        })
        .map(|point| point.position)
}

impl Navigation {
    pub fn new(rest_heading: Vec2) -> Self {
        Self {
            rest_heading,
            ..Default::default()
        }
    }

    /// Points the route at `destination`. A destination that moved more
    /// than `tolerance` starts a fresh route.
    pub fn set_destination(&mut self, destination: Vec2, tolerance: f32) {
        let moved = self
            .destination
            .map_or(true, |current| current.distance(destination) > tolerance);
        if moved {
            self.destination = Some(destination);
            self.waypoint = None;
            self.visited.clear();
        }
    }

    /// Drops the route; a running settle pause is kept
    pub fn clear(&mut self) {
        self.destination = None;
        self.waypoint = None;
        self.visited.clear();
    }

    pub fn is_settling(&self) -> bool {
        self.settle_timer > 0.0
    }

    /// Advances the route one tick from `from`.
    ///
    /// Without level geometry the agent walks straight at the destination.
    /// With geometry, every returned `Move` has a waypoint whose swept path
    /// from `from` is clear: a stored waypoint is re-checked before use and
    /// replaced if something now blocks it.
    #[allow(clippy::too_many_arguments)]
    pub fn advance(
        &mut self,
        from: Vec2,
        geometry: Option<&LevelGeometry>,
        threat: Option<Vec2>,
        body_radius: f32,
        movement: &MovementConfig,
        cover: &CoverConfig,
        dt: f32,
    ) -> Step {
        if self.settle_timer > 0.0 {
            self.settle_timer = (self.settle_timer - dt).max(0.0);
            return Step::Settle;
        }

        let Some(destination) = self.destination else {
            return Step::Arrived;
        };
        if from.distance(destination) <= movement.arrive_radius {
            self.clear();
            return Step::Arrived;
        }

        // Reaching the destination itself is not a hop: no settle pause
        if let Some(waypoint) = self.waypoint.filter(|w| *w != destination) {
            if from.distance(waypoint) <= movement.waypoint_radius {
                self.waypoint = None;
                if self.visited.len() == VISITED_HOPS {
                    self.visited.remove(0);
                }
                self.visited.push(waypoint);
                if movement.settle_time > 0.0 {
                    self.settle_timer = movement.settle_time;
                    return Step::Settle;
                }
            }
        }

        let Some(geometry) = geometry else {
            self.waypoint = Some(destination);
            return Self::move_to(from, destination);
        };

        if let Some(waypoint) = self.waypoint {
            if !geometry.path_clear(from, waypoint, body_radius) {
                tracing::trace!(?waypoint, "waypoint blocked, recomputing");
                self.waypoint = None;
            }
        }

        if self.waypoint.is_none() {
            self.waypoint = next_hop(
                geometry,
                from,
                destination,
                threat,
                body_radius,
                cover,
                &self.visited,
            );
        }

        match self.waypoint {
            Some(waypoint) => Self::move_to(from, waypoint),
            None => Step::Blocked,
        }
    }

    fn move_to(from: Vec2, waypoint: Vec2) -> Step {
        Step::Move {
            waypoint,
            direction: (waypoint - from).normalize_or_zero(),
        }
    }
}
