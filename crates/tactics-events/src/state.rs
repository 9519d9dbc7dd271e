//! State Kinds
//!
//! Fieldless names for every state of the agent state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an agent state, without the per-state data the engine carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Idle,
    Patrol,
    Combat,
    Retreating,
    SeekingCover,
    Pursuing,
    Flanking,
    Suppressed,
    Assault,
    Dead,
}

impl StateKind {
    /// Returns all state kinds in declaration order.
    pub fn all() -> &'static [StateKind] {
        &[
            StateKind::Idle,
            StateKind::Patrol,
            StateKind::Combat,
            StateKind::Retreating,
            StateKind::SeekingCover,
            StateKind::Pursuing,
            StateKind::Flanking,
            StateKind::Suppressed,
            StateKind::Assault,
            StateKind::Dead,
        ]
    }

    /// States that press the player. The reload-complete reflex only
    /// fires from these.
    pub fn is_aggressive(self) -> bool {
        matches!(
            self,
            StateKind::Combat | StateKind::Assault | StateKind::Pursuing | StateKind::Flanking
        )
    }

    /// States hanging off COMBAT in the transition diagram.
    pub fn is_tactical(self) -> bool {
        matches!(
            self,
            StateKind::Retreating
                | StateKind::SeekingCover
                | StateKind::Pursuing
                | StateKind::Flanking
                | StateKind::Suppressed
                | StateKind::Assault
        )
    }

    /// Terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, StateKind::Dead)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateKind::Idle => "idle",
            StateKind::Patrol => "patrol",
            StateKind::Combat => "combat",
            StateKind::Retreating => "retreating",
            StateKind::SeekingCover => "seeking_cover",
            StateKind::Pursuing => "pursuing",
            StateKind::Flanking => "flanking",
            StateKind::Suppressed => "suppressed",
            StateKind::Assault => "assault",
            StateKind::Dead => "dead",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggressive_states() {
        let aggressive: Vec<_> = StateKind::all()
            .iter()
            .copied()
            .filter(|s| s.is_aggressive())
            .collect();
        assert_eq!(
            aggressive,
            vec![
                StateKind::Combat,
                StateKind::Pursuing,
                StateKind::Flanking,
                StateKind::Assault
            ]
        );
    }

    #[test]
    fn test_only_dead_is_terminal() {
        for state in StateKind::all() {
            assert_eq!(state.is_terminal(), *state == StateKind::Dead);
        }
    }

    #[test]
    fn test_serde_names_match_display() {
        for state in StateKind::all() {
            let json = serde_json::to_string(state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }
}
