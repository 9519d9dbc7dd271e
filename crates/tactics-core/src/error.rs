//! Error Types
//!
//! `AgentError` is returned from every per-agent update; systems log it and
//! move on to the next agent. `SimError` is returned by the simulation facade.

use thiserror::Error;

use crate::components::agent::AgentId;
use crate::config::ConfigError;
use tactics_events::StateKind;

/// Failure inside one agent's tick. Never aborts the whole pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// A collaborator the update needs is absent this tick
    #[error("missing collaborator: {collaborator}")]
    MissingCollaborator { collaborator: &'static str },

    /// Raycast hit a freed or malformed obstacle
    #[error("invalid obstacle #{index}")]
    InvalidGeometry { index: usize },

    /// Positional reasoning was asked of a zero-confidence memory
    #[error("player memory is stale")]
    StaleMemory,

    /// Requested state is unreachable from the live state
    #[error("no legal transition from {from} to {to}")]
    StateInvariant { from: StateKind, to: StateKind },

    /// An input value was NaN or infinite
    #[error("non-finite {what}")]
    NonFinite { what: &'static str },
}

/// Failure reported by the simulation facade
#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let err = AgentError::StateInvariant {
            from: StateKind::Dead,
            to: StateKind::Combat,
        };
        assert_eq!(err.to_string(), "no legal transition from dead to combat");

        let err = SimError::UnknownAgent(AgentId(7));
        assert_eq!(err.to_string(), "unknown agent agent_007");
    }
}
