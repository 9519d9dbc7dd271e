//! State Controller
//!
//! Runs the agent state machine: applies planned transitions through the
//! transition table, owns the firing choke point, the reflex timers and the
//! facing priority list.

pub mod facing;
pub mod fire;
pub mod reflex;
pub mod state;

pub use facing::{FacingInputs, FacingRule};
pub use fire::{FireControl, FireOrder, FireRejection};
pub use reflex::{DamageQueue, DamageReport, Reflexes};
pub use state::{AgentState, FlankSide, TacticalState, TransitionTable};

use crate::error::AgentError;
use tactics_events::{StateKind, TransitionCause};

/// One state change the controller made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: StateKind,
    pub to: StateKind,
    pub cause: TransitionCause,
}

/// Moves `current` to `requested`.
///
/// A direct edge is taken as is. Otherwise the shortest legal route is
/// walked, each intermediate hop reported with [`TransitionCause::Routing`]
/// and the final hop with `cause`. Requesting the current kind is a no-op
/// that keeps the existing state data.
///
/// Fails with [`AgentError::StateInvariant`] when no route exists; `current`
/// is left untouched.
pub fn transition(
    table: &TransitionTable,
    current: &mut TacticalState,
    requested: AgentState,
    cause: TransitionCause,
    now: f64,
) -> Result<Vec<StateChange>, AgentError> {
    let from = current.kind();
    let to = requested.kind();
    if from == to {
        return Ok(Vec::new());
    }

    let route = if table.allows(from, to) {
        vec![to]
    } else {
        table
            .route(from, to)
            .ok_or(AgentError::StateInvariant { from, to })?
    };

    let mut changes = Vec::with_capacity(route.len());
    let mut previous = from;
    for (i, &hop) in route.iter().enumerate() {
        let last = i + 1 == route.len();
        changes.push(StateChange {
            from: previous,
            to: hop,
            cause: if last { cause } else { TransitionCause::Routing },
        });
        previous = hop;
    }

    *current = TacticalState::new(requested, now);
    Ok(changes)
}
