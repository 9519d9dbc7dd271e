//! Cover Scoring
//!
//! Candidate cover points sit just off obstacle corners and edge midpoints.
//! Each is scored on concealment from the threat, distance to the agent's
//! tactical goal and travel distance, and must be reachable in a straight
//! line from where the agent stands. Nothing here is cached: cover is
//! recomputed on demand.

use glam::Vec2;

use crate::config::CoverConfig;
use crate::geometry::LevelGeometry;

/// A scored cover candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverPoint {
    pub position: Vec2,
    pub score: f32,
    /// Opaque geometry blocks the threat's sight line to this point
    pub conceals: bool,
    /// Obstacle the point hugs
    pub obstacle: usize,
}

/// Where to look for cover and against what
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverQuery {
    /// Agent position
    pub origin: Vec2,
    /// Position to hide from
    pub threat: Vec2,
    /// Where the agent ultimately wants to be
    pub goal: Vec2,
    /// Search radius around the origin
    pub radius: f32,
    /// Agent body radius for clearance checks
    pub body_radius: f32,
}

/// Raw candidate positions around every usable obstacle within `radius` of
/// `origin`, with the obstacle index. Points inside geometry are dropped.
pub fn candidates(
    geometry: &LevelGeometry,
    origin: Vec2,
    radius: f32,
    offset: f32,
    body_radius: f32,
) -> Vec<(Vec2, usize)> {
    let mut points = Vec::new();
    for (index, obstacle) in geometry.usable() {
        let center = obstacle.center();
        for corner in obstacle.corners() {
            points.push((corner + (corner - center).signum() * offset, index));
        }
        let (min, max) = (obstacle.min, obstacle.max);
        let mid_x = center.x;
        let mid_y = center.y;
        points.push((Vec2::new(mid_x, min.y - offset), index));
        points.push((Vec2::new(mid_x, max.y + offset), index));
        points.push((Vec2::new(min.x - offset, mid_y), index));
        points.push((Vec2::new(max.x + offset, mid_y), index));
    }
    points.retain(|(point, _)| {
        point.distance(origin) <= radius && geometry.point_free(*point, body_radius)
    });
    points
}

/// Whether `point` is hidden from `threat`
pub fn conceals(geometry: &LevelGeometry, threat: Vec2, point: Vec2) -> bool {
    geometry.is_blocked(threat, point)
}

/// Whether an agent at `position` is currently out of the threat's sight
pub fn in_cover(geometry: &LevelGeometry, position: Vec2, threat: Vec2) -> bool {
    conceals(geometry, threat, position)
}

/// Score of a point; higher is better
pub fn score_point(point: Vec2, hidden: bool, query: &CoverQuery, config: &CoverConfig) -> f32 {
    let scale = query.radius.max(1.0);
    let mut score = -config.goal_weight * point.distance(query.goal) / scale
        - config.travel_weight * point.distance(query.origin) / scale;
    if hidden {
        score += config.conceal_weight;
    }
    if point.distance(query.threat) < config.threat_min_distance {
        score -= config.threat_penalty;
    }
    score
}

/// All reachable candidates, best first. The order is fully determined by
/// score, then position, then obstacle index.
pub fn rank_cover(geometry: &LevelGeometry, query: &CoverQuery, config: &CoverConfig) -> Vec<CoverPoint> {
    let mut ranked: Vec<CoverPoint> = candidates(
        geometry,
        query.origin,
        query.radius,
        config.offset,
        query.body_radius,
    )
    .into_iter()
    .filter(|(point, _)| geometry.path_clear(query.origin, *point, query.body_radius))
    .map(|(position, obstacle)| {
        let hidden = conceals(geometry, query.threat, position);
        CoverPoint {
            position,
            score: score_point(position, hidden, query, config),
            conceals: hidden,
            obstacle,
        }
    })
    .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.position.x.total_cmp(&b.position.x))
            .then(a.position.y.total_cmp(&b.position.y))
            .then(a.obstacle.cmp(&b.obstacle))
    });
    ranked
}

/// Best reachable point that actually hides the agent
pub fn find_best_cover(geometry: &LevelGeometry, query: &CoverQuery, config: &CoverConfig) -> Option<CoverPoint> {
    rank_cover(geometry, query, config)
        .into_iter()
        .find(|point| point.conceals)
}
