//! Event Types
//!
//! Telemetry records produced by the engine once per notable occurrence.
//! One record per line when written as JSONL.

use serde::{Deserialize, Serialize};

use crate::state::StateKind;

/// 2D point or direction in world units, `[x, y]`.
pub type Point = [f32; 2];

/// Why a state transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Normal lowest-cost plan
    Plan,
    /// A priority action overrode the current state
    PriorityOverride,
    /// Intermediate hop while routing through the transition table
    Routing,
    /// Delayed downgrade after hearing the player finish a reload
    ReloadReflex,
    /// FLANKING gave up and fell back to PURSUING
    FlankTimeout,
    /// Planner asked for an unreachable state
    Fallback,
    /// Health reached zero
    Death,
}

/// Timed reflex that fired on an agent. Hits are reported as
/// [`AgentEventKind::HitReaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reflex {
    ReloadCompleteHeard,
    ReloadDowngrade,
    CornerPeek,
}

/// Why a memory was wiped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// A world freeze affecting this agent ended
    FreezeEnded,
    /// An authoritative invalidation (rewind, scripted reset)
    Invalidated,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEventKind {
    StateChanged {
        from: StateKind,
        to: StateKind,
        cause: TransitionCause,
    },
    ActionSelected {
        action: String,
        cost: f32,
        priority: bool,
    },
    Fired {
        direction: Point,
    },
    HitReaction {
        direction: Point,
        amount: f32,
    },
    ReflexTriggered {
        reflex: Reflex,
    },
    IntelReceived {
        from: u32,
        confidence: f32,
    },
    MemoryReset {
        reason: ResetReason,
    },
    InvariantViolation {
        from: StateKind,
        requested: StateKind,
        fallback: StateKind,
    },
    GrenadeThrown {
        target: Point,
    },
    Died,
}

impl AgentEventKind {
    /// Short label used in log lines and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            AgentEventKind::StateChanged { .. } => "state_changed",
            AgentEventKind::ActionSelected { .. } => "action_selected",
            AgentEventKind::Fired { .. } => "fired",
            AgentEventKind::HitReaction { .. } => "hit_reaction",
            AgentEventKind::ReflexTriggered { .. } => "reflex_triggered",
            AgentEventKind::IntelReceived { .. } => "intel_received",
            AgentEventKind::MemoryReset { .. } => "memory_reset",
            AgentEventKind::InvariantViolation { .. } => "invariant_violation",
            AgentEventKind::GrenadeThrown { .. } => "grenade_thrown",
            AgentEventKind::Died => "died",
        }
    }
}

/// One telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Simulation tick the event was produced in
    pub tick: u64,
    /// Simulation time in seconds
    pub time: f64,
    /// Id of the agent the event concerns
    pub agent: u32,
    pub kind: AgentEventKind,
}

impl AgentEvent {
    pub fn new(tick: u64, time: f64, agent: u32, kind: AgentEventKind) -> Self {
        Self {
            tick,
            time,
            agent,
            kind,
        }
    }

    /// Serializes the event to a single JSON line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Returns the (from, to) pair if this is a state change.
    pub fn state_change(&self) -> Option<(StateKind, StateKind)> {
        match self.kind {
            AgentEventKind::StateChanged { from, to, .. } => Some((from, to)),
            _ => None,
        }
    }
}
