//! Player Memory
//!
//! Each agent's belief about where the player is. Confidence rises only
//! through observation (sight, sound, intel) and otherwise decays toward
//! zero. At zero the remembered position is stale and is never handed out.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::agent::AgentId;
use crate::error::AgentError;
use crate::perception::hearing::SoundCategory;

/// Where the current belief came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemorySource {
    #[default]
    None,
    Vision,
    Hearing(SoundCategory),
    Intel(AgentId),
}

/// Decaying belief about the player's whereabouts
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerMemory {
    position: Vec2,
    confidence: f32,
    last_updated: f64,
    source: MemorySource,
}

impl PlayerMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn last_updated(&self) -> f64 {
        self.last_updated
    }

    pub fn source(&self) -> MemorySource {
        self.source
    }

    pub fn is_stale(&self) -> bool {
        self.confidence <= 0.0
    }

    /// Suspected player position, or `None` once confidence has run out
    pub fn suspected_position(&self) -> Option<Vec2> {
        (!self.is_stale()).then_some(self.position)
    }

    /// As [`suspected_position`](Self::suspected_position), for code paths
    /// that cannot proceed without one.
    pub fn require_position(&self) -> Result<Vec2, AgentError> {
        self.suspected_position().ok_or(AgentError::StaleMemory)
    }

    /// Records an observation. The position is replaced; confidence becomes
    /// the larger of the current and observed values.
    pub fn observe(&mut self, position: Vec2, confidence: f32, now: f64, source: MemorySource) {
        self.position = position;
        self.confidence = self.confidence.max(confidence.clamp(0.0, 1.0));
        self.last_updated = now;
        self.source = source;
    }

    /// Offers intel copied from a peer. Accepted only if
    /// `source_confidence * factor` beats what this agent already believes.
    /// Returns the accepted confidence.
    pub fn accept_intel(
        &mut self,
        position: Vec2,
        source_confidence: f32,
        factor: f32,
        from: AgentId,
        now: f64,
    ) -> Option<f32> {
        let offered = (source_confidence * factor).clamp(0.0, 1.0);
        if offered <= self.confidence {
            return None;
        }
        self.position = position;
        self.confidence = offered;
        self.last_updated = now;
        self.source = MemorySource::Intel(from);
        Some(offered)
    }

    /// `confidence -= rate * dt`, floored at zero
    pub fn decay(&mut self, rate: f32, dt: f32) {
        self.confidence = (self.confidence - rate * dt).max(0.0);
    }

    /// Forced reset after a freeze or rewind
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}
