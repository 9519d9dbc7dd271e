//! ECS Systems
//!
//! The per-tick pipeline: status upkeep, perception, world state and
//! planning, state execution and facing. [`crate::schedule`] chains them in
//! a fixed order. Every per-agent failure is logged and the pass moves on
//! to the next agent.

pub mod decision;
pub mod execution;
pub mod perception;
pub mod status;

use bevy_ecs::prelude::*;
use glam::Vec2;

use crate::components::agent::{Agent, AgentId, Dead, Frozen};
use crate::error::AgentError;

pub use decision::{plan_actions, run_reflexes, update_world_states};
pub use execution::{execute_states, finish_tick, resolve_facing};
pub use perception::{decay_memories, process_hearing, share_intel, update_vision};
pub use status::{advance_timers, apply_damage, build_roster};

/// Filter for agents that take part in a tick: alive and not frozen
pub type Live = (With<Agent>, Without<Dead>, Without<Frozen>);

/// One roster entry: an agent that is alive, frozen or not
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RosterEntry {
    pub id: AgentId,
    pub position: Vec2,
    pub frozen: bool,
}

/// Positions of every agent still alive at the start of the tick, by
/// ascending id. Frozen agents are listed and flagged: they are skipped as
/// allies but still block firing lines. Cross-agent checks read this
/// instead of querying bodies.
#[derive(Resource, Debug, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn rebuild(&mut self, mut entries: Vec<RosterEntry>) {
        entries.sort_by_key(|entry| entry.id);
        self.entries = entries;
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Unfrozen allies of `agent` within `radius`
    pub fn allies_near(&self, agent: AgentId, position: Vec2, radius: f32) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.id != agent && !e.frozen && e.position.distance(position) <= radius)
            .count() as u32
    }

    /// Whether an ally stands within `clearance` of the firing line
    pub fn ally_in_line(&self, agent: AgentId, from: Vec2, to: Vec2, clearance: f32) -> bool {
        self.entries
            .iter()
            .filter(|e| e.id != agent)
            .any(|e| distance_to_segment(e.position, from, to) < clearance)
    }
}

fn distance_to_segment(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// Logs a per-agent failure at the level its kind deserves
pub(crate) fn report(agent: AgentId, stage: &'static str, err: &AgentError) {
    match err {
        AgentError::MissingCollaborator { .. } | AgentError::StaleMemory => {
            tracing::trace!(%agent, stage, %err, "degraded update");
        }
        AgentError::StateInvariant { .. } => {
            tracing::error!(%agent, stage, %err, "state invariant violated");
        }
        AgentError::InvalidGeometry { .. } | AgentError::NonFinite { .. } => {
            tracing::warn!(%agent, stage, %err, "agent update skipped");
        }
    }
}
