//! Agent Components
//!
//! Body, health and weapon status for individual agents.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker component identifying an entity as an agent
#[derive(Component, Debug, Clone, Default)]
pub struct Agent;

/// Stable agent identifier, assigned in spawn order.
/// Every cross-agent pass iterates in ascending id order.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent_{:03}", self.0)
    }
}

/// Physical body. Position and velocity are written by the physics
/// collaborator; facing is written by the engine.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Unit vector the agent is looking along
    pub facing: Vec2,
    pub radius: f32,
}

impl Body {
    pub fn new(position: Vec2, facing: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            facing: facing.try_normalize().unwrap_or(Vec2::X),
            radius,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.facing.is_finite()
    }
}

/// Hit points
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Current health as a fraction of max, 0.0 to 1.0
    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }

    /// Subtracts damage. Returns true if this hit was lethal.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        let was_alive = self.current > 0.0;
        self.current = (self.current - amount.max(0.0)).max(0.0);
        was_alive && self.current <= 0.0
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }
}

/// Marker for agents whose health reached zero. Terminal.
#[derive(Component, Debug, Clone, Default)]
pub struct Dead;

/// Marker for agents suspended by a world-level freeze.
/// Frozen agents are skipped by every system.
#[derive(Component, Debug, Clone, Default)]
pub struct Frozen;

/// Weapon state reported by the weapon collaborator
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStatus {
    pub ammo: u32,
    pub magazine_size: u32,
    /// False while reloading or otherwise unable to fire
    pub ready: bool,
}

impl WeaponStatus {
    pub fn full(magazine_size: u32) -> Self {
        Self {
            ammo: magazine_size,
            magazine_size,
            ready: true,
        }
    }

    /// Ammo loaded and weapon ready
    pub fn can_shoot(&self) -> bool {
        self.ready && self.ammo > 0
    }

    pub fn ammo_fraction(&self) -> f32 {
        if self.magazine_size == 0 {
            return 0.0;
        }
        (self.ammo as f32 / self.magazine_size as f32).clamp(0.0, 1.0)
    }

    pub fn needs_reload(&self) -> bool {
        self.ready && self.ammo == 0
    }
}

/// Grenade pouch
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grenades {
    pub count: u32,
    /// Seconds until the next throw is allowed
    pub cooldown_remaining: f32,
}

impl Grenades {
    pub fn new(count: u32) -> Self {
        Self {
            count,
            cooldown_remaining: 0.0,
        }
    }

    pub fn ready(&self) -> bool {
        self.count > 0 && self.cooldown_remaining <= 0.0
    }
}
