//! Agent States
//!
//! The tagged state enum the controller runs, and the table of legal
//! transitions between state kinds.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use tactics_events::StateKind;

/// Which way around the player a flank swings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlankSide {
    /// Counter-clockwise around the player
    Left,
    /// Clockwise around the player
    Right,
}

impl FlankSide {
    /// Rotation sign: +1 counter-clockwise, -1 clockwise
    pub fn sign(self) -> f32 {
        match self {
            FlankSide::Left => 1.0,
            FlankSide::Right => -1.0,
        }
    }

    pub fn opposite(self) -> FlankSide {
        match self {
            FlankSide::Left => FlankSide::Right,
            FlankSide::Right => FlankSide::Left,
        }
    }
}

/// Live agent state, with the data each state needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentState {
    Idle,
    Patrol,
    Combat,
    Retreating,
    SeekingCover,
    Pursuing,
    Flanking {
        side: FlankSide,
        /// Flank point the agent is heading for
        target: Vec2,
        /// Player position the flank was computed around
        anchor: Vec2,
    },
    Suppressed,
    Assault,
    Dead,
}

impl AgentState {
    pub fn kind(&self) -> StateKind {
        match self {
            AgentState::Idle => StateKind::Idle,
            AgentState::Patrol => StateKind::Patrol,
            AgentState::Combat => StateKind::Combat,
            AgentState::Retreating => StateKind::Retreating,
            AgentState::SeekingCover => StateKind::SeekingCover,
            AgentState::Pursuing => StateKind::Pursuing,
            AgentState::Flanking { .. } => StateKind::Flanking,
            AgentState::Suppressed => StateKind::Suppressed,
            AgentState::Assault => StateKind::Assault,
            AgentState::Dead => StateKind::Dead,
        }
    }

    /// The state for a kind that carries no data. `None` for FLANKING.
    pub fn simple(kind: StateKind) -> Option<AgentState> {
        Some(match kind {
            StateKind::Idle => AgentState::Idle,
            StateKind::Patrol => AgentState::Patrol,
            StateKind::Combat => AgentState::Combat,
            StateKind::Retreating => AgentState::Retreating,
            StateKind::SeekingCover => AgentState::SeekingCover,
            StateKind::Pursuing => AgentState::Pursuing,
            StateKind::Flanking => return None,
            StateKind::Suppressed => AgentState::Suppressed,
            StateKind::Assault => AgentState::Assault,
            StateKind::Dead => AgentState::Dead,
        })
    }
}

/// Current state and when it was entered
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct TacticalState {
    pub state: AgentState,
    pub entered_at: f64,
}

impl TacticalState {
    pub fn new(state: AgentState, now: f64) -> Self {
        Self {
            state,
            entered_at: now,
        }
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    /// Seconds spent in the current state
    pub fn time_in_state(&self, now: f64) -> f64 {
        (now - self.entered_at).max(0.0)
    }
}

impl Default for TacticalState {
    fn default() -> Self {
        Self::new(AgentState::Idle, 0.0)
    }
}

/// Legal state-kind transitions
#[derive(Resource, Debug, Clone, Default)]
pub struct TransitionTable {
    edges: BTreeSet<(StateKind, StateKind)>,
}

impl TransitionTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard state diagram:
    ///
    /// - IDLE ⇄ PATROL ⇄ COMBAT, PATROL → PURSUING
    /// - COMBAT ⇄ every tactical state, tactical ⇄ tactical
    /// - PURSUING → PATROL
    /// - any live state → ASSAULT (priority bypass)
    /// - any state → DEAD; DEAD has no exits
    pub fn standard() -> Self {
        use StateKind::*;

        let mut table = Self::empty();
        table.allow(Idle, Patrol);
        table.allow(Patrol, Idle);
        table.allow(Patrol, Combat);
        table.allow(Combat, Patrol);
        table.allow(Patrol, Pursuing);
        table.allow(Pursuing, Patrol);

        let tactical: Vec<StateKind> = StateKind::all()
            .iter()
            .copied()
            .filter(|s| s.is_tactical())
            .collect();
        for &a in &tactical {
            table.allow(Combat, a);
            table.allow(a, Combat);
            for &b in &tactical {
                if a != b {
                    table.allow(a, b);
                }
            }
        }

        for &state in StateKind::all() {
            if state == Dead {
                continue;
            }
            if state != Assault {
                table.allow(state, Assault);
            }
            table.allow(state, Dead);
        }
        table
    }

    pub fn allow(&mut self, from: StateKind, to: StateKind) {
        self.edges.insert((from, to));
    }

    pub fn allows(&self, from: StateKind, to: StateKind) -> bool {
        self.edges.contains(&(from, to))
    }

    /// States that may only be entered as a destination, never passed
    /// through: they need entry data or have entry side effects.
    fn is_waypoint(state: StateKind) -> bool {
        !matches!(state, StateKind::Flanking | StateKind::Assault | StateKind::Dead)
    }

    /// Shortest legal path from `from` to `to`, excluding `from`.
    /// Breadth-first in [`StateKind`] order, so the route is stable.
    pub fn route(&self, from: StateKind, to: StateKind) -> Option<Vec<StateKind>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut previous: Vec<(StateKind, StateKind)> = Vec::new();
        let mut visited: BTreeSet<StateKind> = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for &next in StateKind::all() {
                if visited.contains(&next) || !self.allows(current, next) {
                    continue;
                }
                visited.insert(next);
                previous.push((next, current));

                if next == to {
                    let mut path = vec![to];
                    let mut cursor = current;
                    while cursor != from {
                        path.push(cursor);
                        cursor = previous
                            .iter()
                            .find(|(node, _)| *node == cursor)
                            .map(|(_, parent)| *parent)?;
                    }
                    path.reverse();
                    return Some(path);
                }
                if Self::is_waypoint(next) {
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StateKind::*;

    #[test]
    fn test_standard_edges() {
        let table = TransitionTable::standard();
        assert!(table.allows(Idle, Patrol));
        assert!(table.allows(Patrol, Combat));
        assert!(table.allows(Combat, Flanking));
        assert!(table.allows(Retreating, SeekingCover));
        assert!(table.allows(SeekingCover, Assault));
        assert!(table.allows(Idle, Assault));
        assert!(!table.allows(Idle, Combat));
        assert!(!table.allows(Retreating, Patrol));
    }

    #[test]
    fn test_dead_is_terminal() {
        let table = TransitionTable::standard();
        for &state in StateKind::all() {
            if state != Dead {
                assert!(table.allows(state, Dead));
                assert!(!table.allows(Dead, state));
                assert_eq!(table.route(Dead, state), None);
            }
        }
    }

    #[test]
    fn test_route_through_patrol() {
        let table = TransitionTable::standard();
        assert_eq!(table.route(Idle, Combat), Some(vec![Patrol, Combat]));
        assert_eq!(table.route(Retreating, Patrol), Some(vec![Combat, Patrol]));
        assert_eq!(table.route(Combat, Combat), Some(vec![]));
    }

    #[test]
    fn test_route_never_passes_through_entry_states() {
        let table = TransitionTable::standard();
        let path = table.route(Idle, Flanking).unwrap();
        assert_eq!(path, vec![Patrol, Combat, Flanking]);
        for &from in StateKind::all() {
            for &to in StateKind::all() {
                if let Some(path) = table.route(from, to) {
                    let hops = path.len().saturating_sub(1);
                    assert!(path[..hops]
                        .iter()
                        .all(|s| !matches!(s, Flanking | Assault | Dead)));
                }
            }
        }
    }

    #[test]
    fn test_flank_side() {
        assert_eq!(FlankSide::Left.opposite(), FlankSide::Right);
        assert_eq!(FlankSide::Right.sign(), -1.0);
        assert_eq!(AgentState::simple(Flanking), None);
        assert_eq!(AgentState::simple(Suppressed).map(|s| s.kind()), Some(Suppressed));
    }
}
