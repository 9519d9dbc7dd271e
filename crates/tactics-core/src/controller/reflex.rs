//! Reflexes
//!
//! Countdown timers layered above the planner: hit reaction, under fire,
//! detection delay, the delayed reload-complete downgrade, caution, flank
//! lockout and corner peeks. Timers only advance for live, unfrozen agents.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::mem;

use crate::components::agent::AgentId;
use crate::config::ReflexConfig;
use tactics_events::StateKind;

/// A countdown at or below this counts as expired
pub const TIMER_EPSILON: f32 = 1e-5;

/// Damage taken, as reported by the damage collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    pub amount: f32,
    /// Direction from the victim toward the attacker
    pub attacker_direction: Vec2,
}

/// Damage reports waiting for the next tick
#[derive(Resource, Debug, Default)]
pub struct DamageQueue {
    pending: Vec<(AgentId, DamageReport)>,
}

impl DamageQueue {
    pub fn push(&mut self, agent: AgentId, report: DamageReport) {
        self.pending.push((agent, report));
    }

    /// Drain all pending reports, in arrival order
    pub fn drain(&mut self) -> Vec<(AgentId, DamageReport)> {
        mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Per-agent reflex timers, all in seconds
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct Reflexes {
    pub hit_reaction_timer: f32,
    /// Unit direction toward the last attacker
    pub hit_reaction_direction: Vec2,
    pub under_fire_timer: f32,
    /// Detection delay left before the first shot
    pub reaction_timer: f32,
    /// Armed by hearing the player finish a reload
    pub reload_reflex_timer: Option<f32>,
    pub cautious_timer: f32,
    pub flank_lockout_timer: f32,
    pub peek_timer: f32,
    pub peek_direction: Vec2,
    /// Seconds until the next opening probe
    pub peek_cooldown: f32,
}

fn count_down(timer: &mut f32, dt: f32) {
    *timer = (*timer - dt).max(0.0);
}

impl Reflexes {
    /// Advance every countdown by `dt`
    pub fn tick(&mut self, dt: f32) {
        count_down(&mut self.hit_reaction_timer, dt);
        count_down(&mut self.under_fire_timer, dt);
        count_down(&mut self.reaction_timer, dt);
        count_down(&mut self.cautious_timer, dt);
        count_down(&mut self.flank_lockout_timer, dt);
        count_down(&mut self.peek_timer, dt);
        count_down(&mut self.peek_cooldown, dt);
        if let Some(timer) = self.reload_reflex_timer.as_mut() {
            *timer -= dt;
        }
    }

    /// Attacker direction while the hit reaction runs
    pub fn hit_reaction(&self) -> Option<Vec2> {
        (self.hit_reaction_timer > 0.0).then_some(self.hit_reaction_direction)
    }

    pub fn under_fire(&self) -> bool {
        self.under_fire_timer > 0.0
    }

    pub fn cautious(&self) -> bool {
        self.cautious_timer > 0.0
    }

    pub fn flank_locked(&self) -> bool {
        self.flank_lockout_timer > 0.0
    }

    pub fn detection_pending(&self) -> bool {
        self.reaction_timer > 0.0
    }

    /// Peek direction while a corner peek runs
    pub fn peek(&self) -> Option<Vec2> {
        (self.peek_timer > 0.0).then_some(self.peek_direction)
    }

    /// Starts the hit reaction toward the attacker and marks the agent
    /// under fire. A zero direction keeps the previous one.
    pub fn register_hit(&mut self, report: &DamageReport, config: &ReflexConfig) {
        if let Some(direction) = report.attacker_direction.try_normalize() {
            self.hit_reaction_direction = direction;
        }
        self.hit_reaction_timer = config.hit_reaction_duration;
        self.mark_under_fire(config.under_fire_duration);
    }

    pub fn mark_under_fire(&mut self, duration: f32) {
        self.under_fire_timer = self.under_fire_timer.max(duration);
    }

    /// Arms the reload-complete countdown unless one is already running
    pub fn arm_reload_reflex(&mut self, delay: f32) {
        if self.reload_reflex_timer.is_none() {
            self.reload_reflex_timer = Some(delay);
        }
    }

    /// Consumes the reload-complete countdown once it has run out
    pub fn take_expired_reload_reflex(&mut self) -> bool {
        match self.reload_reflex_timer {
            Some(timer) if timer <= TIMER_EPSILON => {
                self.reload_reflex_timer = None;
                true
            }
            _ => false,
        }
    }

    pub fn start_peek(&mut self, direction: Vec2, duration: f32, interval: f32) {
        self.peek_direction = direction;
        self.peek_timer = duration;
        self.peek_cooldown = interval;
    }

    /// Drops reactions to what the agent heard or was shot at before a
    /// freeze. The hit reaction and flank lockout belong to the agent and
    /// are kept.
    pub fn forget_after_freeze(&mut self) {
        self.reload_reflex_timer = None;
        self.cautious_timer = 0.0;
        self.under_fire_timer = 0.0;
        self.peek_timer = 0.0;
    }

    /// Cancel everything (death)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// State the reload-complete reflex downgrades to, re-checked when the delay
/// runs out: only an agent still in an aggressive state is downgraded.
pub fn reload_downgrade(current: StateKind, has_cover: bool) -> Option<StateKind> {
    if !current.is_aggressive() {
        return None;
    }
    Some(if has_cover {
        StateKind::Retreating
    } else {
        StateKind::SeekingCover
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_reaction_lifecycle() {
        let config = ReflexConfig::default();
        let mut reflexes = Reflexes::default();
        reflexes.register_hit(
            &DamageReport {
                amount: 10.0,
                attacker_direction: Vec2::new(-3.0, 0.0),
            },
            &config,
        );
        assert_eq!(reflexes.hit_reaction(), Some(Vec2::NEG_X));
        assert!(reflexes.under_fire());

        reflexes.tick(0.5);
        assert!(reflexes.hit_reaction().is_some());
        reflexes.tick(0.31);
        assert_eq!(reflexes.hit_reaction(), None);
    }

    #[test]
    fn test_reload_reflex_expires_after_delay() {
        let mut reflexes = Reflexes::default();
        reflexes.arm_reload_reflex(0.2);
        reflexes.arm_reload_reflex(0.5);

        let dt = 1.0 / 60.0;
        for _ in 0..11 {
            reflexes.tick(dt);
            assert!(!reflexes.take_expired_reload_reflex());
        }
        reflexes.tick(dt);
        assert!(reflexes.take_expired_reload_reflex());
        assert_eq!(reflexes.reload_reflex_timer, None);
    }

    #[test]
    fn test_downgrade_rechecks_state() {
        assert_eq!(
            reload_downgrade(StateKind::Combat, true),
            Some(StateKind::Retreating)
        );
        assert_eq!(
            reload_downgrade(StateKind::Flanking, false),
            Some(StateKind::SeekingCover)
        );
        assert_eq!(reload_downgrade(StateKind::Retreating, true), None);
        assert_eq!(reload_downgrade(StateKind::Dead, true), None);
    }

    #[test]
    fn test_clear_cancels_everything() {
        let mut reflexes = Reflexes::default();
        reflexes.arm_reload_reflex(0.2);
        reflexes.cautious_timer = 1.0;
        reflexes.start_peek(Vec2::Y, 0.6, 1.5);
        reflexes.clear();
        assert_eq!(reflexes, Reflexes::default());
    }

    #[test]
    fn test_freeze_forgets_reactions_to_the_player() {
        let mut reflexes = Reflexes::default();
        reflexes.register_hit(
            &DamageReport {
                amount: 10.0,
                attacker_direction: Vec2::Y,
            },
            &ReflexConfig::default(),
        );
        reflexes.arm_reload_reflex(0.2);
        reflexes.cautious_timer = 1.0;
        reflexes.flank_lockout_timer = 2.0;

        reflexes.forget_after_freeze();
        assert_eq!(reflexes.reload_reflex_timer, None);
        assert!(!reflexes.cautious());
        assert!(!reflexes.under_fire());
        assert_eq!(reflexes.hit_reaction(), Some(Vec2::Y));
        assert!(reflexes.flank_locked());
    }

    #[test]
    fn test_damage_queue_drains() {
        let mut queue = DamageQueue::default();
        let report = DamageReport {
            amount: 5.0,
            attacker_direction: Vec2::X,
        };
        queue.push(AgentId(2), report);
        queue.push(AgentId(1), report);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, AgentId(2));
        assert!(queue.is_empty());
    }
}
