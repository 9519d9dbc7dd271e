//! Perception
//!
//! Vision, hearing, the decaying player memory and intel sharing between
//! agents. The pure functions here are driven by the systems in
//! [`crate::systems::perception`].

pub mod hearing;
pub mod intel;
pub mod memory;
pub mod vision;

use bevy_ecs::prelude::*;
use glam::Vec2;

pub use hearing::{HeardSound, SoundCategory, SoundEvent, SoundQueue, SoundSource};
pub use intel::{IntelLedger, IntelPeer, IntelTransfer};
pub use memory::{MemorySource, PlayerMemory};
pub use vision::VisionReport;

/// Player weakness picked up by ear. Cleared by the reload-complete
/// reflex or by expiry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vulnerability {
    pub reloading: bool,
    pub ammo_empty: bool,
    /// Seconds until both flags lapse
    pub remaining: f32,
}

impl Vulnerability {
    pub fn any(&self) -> bool {
        self.reloading || self.ammo_empty
    }

    pub fn mark_reloading(&mut self, duration: f32) {
        self.reloading = true;
        self.remaining = self.remaining.max(duration);
    }

    pub fn mark_ammo_empty(&mut self, duration: f32) {
        self.ammo_empty = true;
        self.remaining = self.remaining.max(duration);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.any() {
            return;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.clear();
        }
    }
}

/// What an agent perceived of the player this tick
#[derive(Component, Debug, Clone, Default)]
pub struct Perception {
    pub player_visible: bool,
    pub player_distracted: bool,
    /// Player position, known only while visible
    pub player_position: Option<Vec2>,
    pub player_distance: Option<f32>,
    /// Loudest player gunshot this tick marked the agent under fire
    pub shot_at: bool,
    pub vulnerability: Vulnerability,
}

impl Perception {
    /// Forget this tick's sightings. Vulnerability persists.
    pub fn blind(&mut self) {
        self.player_visible = false;
        self.player_distracted = false;
        self.player_position = None;
        self.player_distance = None;
    }

    /// Forget everything learned about the player, vulnerability included
    pub fn forget(&mut self) {
        self.blind();
        self.shot_at = false;
        self.vulnerability.clear();
    }

    pub fn apply_vision(&mut self, report: &VisionReport) {
        self.player_visible = report.visible;
        self.player_distracted = report.visible && report.distracted;
        if report.visible {
            self.player_position = Some(report.player_position);
            self.player_distance = Some(report.distance);
        } else {
            self.player_position = None;
            self.player_distance = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vulnerability_expires() {
        let mut vulnerability = Vulnerability::default();
        vulnerability.mark_reloading(0.5);
        assert!(vulnerability.any());
        vulnerability.tick(0.3);
        assert!(vulnerability.reloading);
        vulnerability.tick(0.3);
        assert!(!vulnerability.any());
    }

    #[test]
    fn test_blind_keeps_vulnerability() {
        let mut perception = Perception {
            player_visible: true,
            player_distracted: true,
            player_position: Some(Vec2::ZERO),
            player_distance: Some(50.0),
            ..Default::default()
        };
        perception.vulnerability.mark_ammo_empty(1.0);
        perception.blind();
        assert!(!perception.player_visible);
        assert!(perception.player_position.is_none());
        assert!(perception.vulnerability.ammo_empty);
    }

    #[test]
    fn test_forget_drops_vulnerability() {
        let mut perception = Perception {
            player_visible: true,
            shot_at: true,
            ..Default::default()
        };
        perception.vulnerability.mark_reloading(2.5);
        perception.forget();
        assert!(!perception.player_visible);
        assert!(!perception.shot_at);
        assert!(!perception.vulnerability.any());
    }
}
