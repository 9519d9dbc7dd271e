//! Player Snapshot
//!
//! Read-only view of the human-controlled player, written once per tick by
//! the player collaborator. The resource is removed from the world while no
//! player exists.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Player transform and aim for the current tick
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub position: Vec2,
    /// World-space point the player is aiming at (the mouse cursor)
    pub aim_target: Vec2,
    /// Body radius, used to place vision reference points
    pub radius: f32,
}

impl PlayerSnapshot {
    pub const DEFAULT_RADIUS: f32 = 14.0;

    pub fn new(position: Vec2, aim_target: Vec2) -> Self {
        Self {
            position,
            aim_target,
            radius: Self::DEFAULT_RADIUS,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.aim_target.is_finite() && self.radius.is_finite()
    }
}
