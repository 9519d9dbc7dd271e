//! Level Geometry
//!
//! Axis-aligned obstacles and the raycast queries perception and movement
//! are built on. The level collaborator owns the obstacle list; the engine
//! only asks "what does the segment A→B hit first".

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Below this a direction component is treated as parallel to a slab
const PARALLEL_EPSILON: f32 = 1e-8;

/// What an obstacle is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Blocks sight, sound and movement
    Wall,
    /// Blocks movement only
    Glass,
    /// Low cover; blocks sight and movement
    Crate,
}

impl SurfaceKind {
    pub fn is_opaque(self) -> bool {
        !matches!(self, SurfaceKind::Glass)
    }
}

/// Which surfaces a ray stops at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayMask {
    /// Sight lines: glass is ignored
    Opaque,
    /// Movement: everything solid stops the ray
    All,
}

impl RayMask {
    fn accepts(self, kind: SurfaceKind) -> bool {
        match self {
            RayMask::Opaque => kind.is_opaque(),
            RayMask::All => true,
        }
    }
}

/// Axis-aligned box obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub min: Vec2,
    pub max: Vec2,
    pub kind: SurfaceKind,
    /// Destroyed obstacles stay in the list but are never hit
    pub active: bool,
}

impl Obstacle {
    pub fn new(min: Vec2, max: Vec2, kind: SurfaceKind) -> Self {
        Self {
            min,
            max,
            kind,
            active: true,
        }
    }

    pub fn wall(min: Vec2, max: Vec2) -> Self {
        Self::new(min, max, SurfaceKind::Wall)
    }

    /// Finite and not inverted
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The box grown by `margin` on every side
    pub fn inflated(&self, margin: f32) -> Obstacle {
        Obstacle {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
            ..*self
        }
    }

    /// Corners, counter-clockwise from `min`
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Slab test for the segment `from → to`.
    ///
    /// Returns the entry fraction along the segment and the surface normal at
    /// the entry point. A segment starting inside the box does not hit it.
    pub fn segment_entry(&self, from: Vec2, to: Vec2) -> Option<(f32, Vec2)> {
        let dir = to - from;
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut normal = Vec2::ZERO;

        for axis in 0..2 {
            let axis_normal = if axis == 0 { Vec2::X } else { Vec2::Y };
            if dir[axis].abs() < PARALLEL_EPSILON {
                if from[axis] < self.min[axis] || from[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir[axis];
            let t1 = (self.min[axis] - from[axis]) * inv;
            let t2 = (self.max[axis] - from[axis]) * inv;
            let (near, far, n) = if t1 <= t2 {
                (t1, t2, -axis_normal)
            } else {
                (t2, t1, axis_normal)
            };

            if near > t_enter {
                t_enter = near;
                normal = n;
            }
            t_exit = t_exit.min(far);
            if t_enter > t_exit {
                return None;
            }
        }

        if !(0.0..=1.0).contains(&t_enter) {
            return None;
        }
        Some((t_enter, normal))
    }
}

/// First obstacle hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin
    pub distance: f32,
    pub point: Vec2,
    pub normal: Vec2,
    pub kind: SurfaceKind,
    /// Index into [`LevelGeometry::obstacles`]
    pub obstacle: usize,
}

/// Level geometry resource. Absent from the world when the level
/// collaborator has nothing loaded.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelGeometry {
    obstacles: Vec<Obstacle>,
}

impl LevelGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_obstacles(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// A rectangular arena centred on the origin, walled on all four sides.
    /// `half_extent` is the half size of the open floor.
    pub fn arena(half_extent: Vec2, thickness: f32) -> Self {
        let (hx, hy, t) = (half_extent.x, half_extent.y, thickness);
        Self::from_obstacles(vec![
            Obstacle::wall(Vec2::new(-hx - t, -hy - t), Vec2::new(hx + t, -hy)),
            Obstacle::wall(Vec2::new(-hx - t, hy), Vec2::new(hx + t, hy + t)),
            Obstacle::wall(Vec2::new(-hx - t, -hy), Vec2::new(-hx, hy)),
            Obstacle::wall(Vec2::new(hx, -hy), Vec2::new(hx + t, hy)),
        ])
    }

    /// Adds an obstacle and returns its index
    pub fn add(&mut self, obstacle: Obstacle) -> usize {
        self.obstacles.push(obstacle);
        self.obstacles.len() - 1
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Marks an obstacle destroyed. Returns false for an unknown index.
    pub fn deactivate(&mut self, index: usize) -> bool {
        match self.obstacles.get_mut(index) {
            Some(obstacle) => {
                obstacle.active = false;
                true
            }
            None => false,
        }
    }

    /// Looks up an obstacle that may take part in queries.
    pub fn check(&self, index: usize) -> Result<&Obstacle, AgentError> {
        match self.obstacles.get(index) {
            Some(obstacle) if obstacle.active && obstacle.is_valid() => Ok(obstacle),
            _ => Err(AgentError::InvalidGeometry { index }),
        }
    }

    /// Usable obstacles with their indices
    pub fn usable(&self) -> impl Iterator<Item = (usize, &Obstacle)> {
        (0..self.obstacles.len()).filter_map(move |i| self.check(i).ok().map(|o| (i, o)))
    }

    /// First obstacle on the segment `from → to` that `mask` stops at.
    /// Freed or malformed obstacles count as no hit.
    pub fn raycast(&self, from: Vec2, to: Vec2, mask: RayMask) -> Option<RayHit> {
        let length = from.distance(to);
        let mut best: Option<(f32, Vec2, usize)> = None;

        for (index, obstacle) in self.usable() {
            if !mask.accepts(obstacle.kind) {
                continue;
            }
            if let Some((t, normal)) = obstacle.segment_entry(from, to) {
                if best.map_or(true, |(best_t, _, _)| t < best_t) {
                    best = Some((t, normal, index));
                }
            }
        }

        best.map(|(t, normal, index)| RayHit {
            distance: t * length,
            point: from.lerp(to, t),
            normal,
            kind: self.obstacles[index].kind,
            obstacle: index,
        })
    }

    /// True when opaque geometry blocks sight between the two points
    pub fn is_blocked(&self, from: Vec2, to: Vec2) -> bool {
        self.raycast(from, to, RayMask::Opaque).is_some()
    }

    /// True when no solid obstacle overlaps a circle at `point`
    pub fn point_free(&self, point: Vec2, radius: f32) -> bool {
        self.usable()
            .all(|(_, obstacle)| !obstacle.inflated(radius).contains(point))
    }

    /// Whether a body of `radius` can travel straight from `from` to `to`.
    ///
    /// The centre line is swept against every solid box grown by `radius`,
    /// so obstacles of any thickness are caught. A body already overlapping
    /// a grown box may leave it but never cross the box itself. The
    /// destination must be free.
    pub fn path_clear(&self, from: Vec2, to: Vec2, radius: f32) -> bool {
        if !self.point_free(to, radius) {
            return false;
        }
        if from.distance_squared(to) <= f32::EPSILON {
            return true;
        }
        self.usable().all(|(_, obstacle)| {
            obstacle.inflated(radius).segment_entry(from, to).is_none()
                && obstacle.segment_entry(from, to).is_none()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pillar() -> LevelGeometry {
        LevelGeometry::from_obstacles(vec![Obstacle::wall(
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, 10.0),
        )])
    }

    #[test]
    fn test_raycast_reports_entry() {
        let geometry = pillar();
        let hit = geometry
            .raycast(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0), RayMask::All)
            .unwrap();
        assert!((hit.distance - 40.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
        assert_eq!(hit.obstacle, 0);
    }

    #[test]
    fn test_short_ray_misses() {
        let geometry = pillar();
        assert!(geometry
            .raycast(Vec2::new(-50.0, 0.0), Vec2::new(-20.0, 0.0), RayMask::All)
            .is_none());
        assert!(geometry
            .raycast(Vec2::new(-50.0, 20.0), Vec2::new(50.0, 20.0), RayMask::All)
            .is_none());
    }

    #[test]
    fn test_nearest_obstacle_wins() {
        let mut geometry = pillar();
        geometry.add(Obstacle::wall(
            Vec2::new(-40.0, -5.0),
            Vec2::new(-30.0, 5.0),
        ));
        let hit = geometry
            .raycast(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0), RayMask::All)
            .unwrap();
        assert_eq!(hit.obstacle, 1);
    }

    #[test]
    fn test_glass_is_transparent_to_sight() {
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::new(
            Vec2::new(-1.0, -50.0),
            Vec2::new(1.0, 50.0),
            SurfaceKind::Glass,
        )]);
        let (a, b) = (Vec2::new(-20.0, 0.0), Vec2::new(20.0, 0.0));
        assert!(!geometry.is_blocked(a, b));
        assert!(geometry.raycast(a, b, RayMask::All).is_some());
        assert!(!geometry.path_clear(a, b, 5.0));
    }

    #[test]
    fn test_deactivated_obstacle_is_ignored() {
        let mut geometry = pillar();
        assert!(geometry.deactivate(0));
        assert!(!geometry.deactivate(3));
        assert!(!geometry.is_blocked(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0)));
        assert_eq!(
            geometry.check(0),
            Err(AgentError::InvalidGeometry { index: 0 })
        );
    }

    #[test]
    fn test_malformed_obstacle_is_ignored() {
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::wall(
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, -10.0),
        )]);
        assert!(!geometry.is_blocked(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0)));
    }

    #[test]
    fn test_ray_from_inside_does_not_hit() {
        let geometry = pillar();
        assert!(geometry
            .raycast(Vec2::ZERO, Vec2::new(50.0, 0.0), RayMask::All)
            .is_none());
    }

    #[test]
    fn test_thick_path_catches_grazing_pass() {
        let geometry = pillar();
        // The centre line clears the pillar by 5 units; a 14-unit body does not.
        let from = Vec2::new(-50.0, 15.0);
        let to = Vec2::new(50.0, 15.0);
        assert!(geometry.raycast(from, to, RayMask::All).is_none());
        assert!(!geometry.path_clear(from, to, 14.0));
        assert!(geometry.path_clear(Vec2::new(-50.0, 30.0), Vec2::new(50.0, 30.0), 14.0));
    }

    #[test]
    fn test_thin_post_between_flanks_blocks_path() {
        // A post well inside the body's sweep but clear of the centre line
        // and of both flank lines
        let geometry = LevelGeometry::from_obstacles(vec![Obstacle::wall(
            Vec2::new(-1.0, 6.0),
            Vec2::new(1.0, 8.0),
        )]);
        let (from, to) = (Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0));
        assert!(geometry.raycast(from, to, RayMask::All).is_none());
        assert!(geometry
            .raycast(from + Vec2::Y * 14.0, to + Vec2::Y * 14.0, RayMask::All)
            .is_none());
        assert!(!geometry.path_clear(from, to, 14.0));
    }

    #[test]
    fn test_body_touching_wall_can_step_away_not_through() {
        let geometry = pillar();
        let from = Vec2::new(-20.0, 0.0);
        assert!(geometry.path_clear(from, Vec2::new(-60.0, 0.0), 14.0));
        assert!(!geometry.path_clear(from, Vec2::new(60.0, 0.0), 14.0));
    }

    #[test]
    fn test_arena_encloses_floor() {
        let geometry = LevelGeometry::arena(Vec2::new(100.0, 80.0), 10.0);
        assert!(geometry.point_free(Vec2::ZERO, 14.0));
        assert!(!geometry.point_free(Vec2::new(95.0, 0.0), 14.0));
        assert!(geometry.is_blocked(Vec2::ZERO, Vec2::new(200.0, 0.0)));
    }
}
