//! Firing Discipline
//!
//! [`FireControl::request`] is the only way to obtain a [`FireOrder`], and
//! the only place the weapon-ready and cooldown checks live. Every shot the
//! engine emits, priority attacks included, goes through it.

use bevy_ecs::prelude::*;
use glam::Vec2;
use thiserror::Error;

use crate::components::agent::{AgentId, WeaponStatus};

/// Slack on the cooldown comparison so a shot exactly one cooldown after the
/// last one is not lost to float rounding
pub const COOLDOWN_TOLERANCE: f64 = 1e-6;

/// Permission to fire one shot. Only [`FireControl::request`] can make one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireOrder {
    pub agent: AgentId,
    /// Unit aim direction
    pub direction: Vec2,
    /// Simulation time the shot was approved
    pub time: f64,
    _seal: (),
}

/// Why a shot was refused
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FireRejection {
    #[error("weapon not ready")]
    WeaponNotReady,

    #[error("magazine empty")]
    NoAmmo,

    #[error("cooling down, {remaining:.3}s left")]
    CoolingDown { remaining: f64 },

    #[error("no aim direction")]
    NoDirection,
}

/// Agent-side rate-of-fire guard. The weapon collaborator applies its own
/// checks as well.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct FireControl {
    /// Minimum seconds between shots
    pub cooldown: f32,
    last_shot_at: Option<f64>,
}

impl FireControl {
    pub fn new(cooldown: f32) -> Self {
        Self {
            cooldown,
            last_shot_at: None,
        }
    }

    pub fn last_shot_at(&self) -> Option<f64> {
        self.last_shot_at
    }

    /// Seconds until the next shot is allowed at `now`
    pub fn remaining(&self, now: f64) -> f64 {
        match self.last_shot_at {
            Some(last) => (self.cooldown as f64 - (now - last)).max(0.0),
            None => 0.0,
        }
    }

    /// Approves a shot if the weapon can shoot and the cooldown has elapsed.
    /// Approval starts the next cooldown.
    pub fn request(
        &mut self,
        agent: AgentId,
        weapon: &WeaponStatus,
        direction: Vec2,
        now: f64,
    ) -> Result<FireOrder, FireRejection> {
        if !weapon.ready {
            return Err(FireRejection::WeaponNotReady);
        }
        if weapon.ammo == 0 {
            return Err(FireRejection::NoAmmo);
        }
        if let Some(last) = self.last_shot_at {
            let elapsed = now - last;
            if elapsed < self.cooldown as f64 - COOLDOWN_TOLERANCE {
                return Err(FireRejection::CoolingDown {
                    remaining: self.cooldown as f64 - elapsed,
                });
            }
        }
        let direction = direction.try_normalize().ok_or(FireRejection::NoDirection)?;

        self.last_shot_at = Some(now);
        Ok(FireOrder {
            agent,
            direction,
            time: now,
            _seal: (),
        })
    }

    /// Forget the last shot (respawn or reset)
    pub fn reset(&mut self) {
        self.last_shot_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_scenario() {
        let mut fire = FireControl::new(0.1);
        let weapon = WeaponStatus::full(30);
        let agent = AgentId(0);

        assert!(fire.request(agent, &weapon, Vec2::X, 0.0).is_ok());
        match fire.request(agent, &weapon, Vec2::X, 0.08) {
            Err(FireRejection::CoolingDown { remaining }) => {
                assert!((remaining - 0.02).abs() < 1e-6)
            }
            other => panic!("expected cooldown rejection, got {other:?}"),
        }
        // The rejected request did not restart the cooldown
        let order = fire.request(agent, &weapon, Vec2::X, 0.10).unwrap();
        assert_eq!(order.time, 0.10);
        assert_eq!(order.agent, agent);
    }

    #[test]
    fn test_weapon_state_checked_first() {
        let mut fire = FireControl::new(0.1);
        let mut weapon = WeaponStatus::full(30);
        weapon.ready = false;
        assert_eq!(
            fire.request(AgentId(0), &weapon, Vec2::X, 0.0),
            Err(FireRejection::WeaponNotReady)
        );
        weapon.ready = true;
        weapon.ammo = 0;
        assert_eq!(
            fire.request(AgentId(0), &weapon, Vec2::X, 0.0),
            Err(FireRejection::NoAmmo)
        );
        assert_eq!(fire.last_shot_at(), None);
    }

    #[test]
    fn test_direction_is_normalized() {
        let mut fire = FireControl::new(0.1);
        let weapon = WeaponStatus::full(30);
        let order = fire
            .request(AgentId(1), &weapon, Vec2::new(0.0, 5.0), 1.0)
            .unwrap();
        assert_eq!(order.direction, Vec2::Y);
        assert_eq!(
            fire.request(AgentId(1), &weapon, Vec2::ZERO, 2.0),
            Err(FireRejection::NoDirection)
        );
    }

    #[test]
    fn test_remaining() {
        let mut fire = FireControl::new(0.5);
        assert_eq!(fire.remaining(0.0), 0.0);
        fire.request(AgentId(0), &WeaponStatus::full(1), Vec2::X, 1.0)
            .unwrap();
        assert!((fire.remaining(1.2) - 0.3).abs() < 1e-6);
        fire.reset();
        assert_eq!(fire.remaining(1.2), 0.0);
    }
}
