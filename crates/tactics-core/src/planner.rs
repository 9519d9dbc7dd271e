//! Planner
//!
//! Single-step goal-oriented action selection, re-run every tick. Priority
//! actions are checked first and win outright; otherwise the cheapest
//! admissible action is chosen, ties broken by [`ActionKind`] order.

use crate::actions::{ActionKind, ActionLibrary};
use crate::config::CostTuning;
use crate::world_state::WorldState;

/// The action chosen for this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub action: ActionKind,
    pub cost: f32,
    /// Chosen by the priority pass
    pub priority: bool,
}

/// Picks the action for `state`.
///
/// Returns `None` only for a library with no admissible finite-cost entry;
/// the standard library always admits `Idle`.
pub fn select_action(state: &WorldState, library: &ActionLibrary, tuning: &CostTuning) -> Option<Plan> {
    let priority = library
        .actions()
        .iter()
        .filter(|action| action.kind.is_priority())
        .find(|action| action.is_admissible(state));
    if let Some(action) = priority {
        return Some(Plan {
            action: action.kind,
            cost: action.cost(state, tuning),
            priority: true,
        });
    }

    library
        .actions()
        .iter()
        .filter(|action| !action.kind.is_priority() && action.is_admissible(state))
        .map(|action| (action.cost(state, tuning), action.kind))
        .filter(|(cost, _)| cost.is_finite())
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(cost, action)| Plan {
            action,
            cost,
            priority: false,
        })
}

/// Cheapest admissible of `Patrol` and `Idle`, used when the chosen
/// action's state cannot be reached.
pub fn fallback_action(state: &WorldState, library: &ActionLibrary, tuning: &CostTuning) -> Plan {
    library
        .actions()
        .iter()
        .filter(|a| matches!(a.kind, ActionKind::Patrol | ActionKind::Idle))
        .filter(|a| a.is_admissible(state))
        .map(|a| (a.cost(state, tuning), a.kind))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(cost, action)| Plan {
            action,
            cost,
            priority: false,
        })
        .unwrap_or(Plan {
            action: ActionKind::Idle,
            cost: tuning.idle,
            priority: false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_state::Fact;

    fn select(state: &WorldState) -> Plan {
        select_action(state, &ActionLibrary::default(), &CostTuning::default()).unwrap()
    }

    fn engaged() -> WorldState {
        WorldState::new()
            .with(Fact::PlayerVisible, true)
            .with(Fact::CanShoot, true)
            .with(Fact::ClearShot, true)
            .with(Fact::PlayerDistance, 300.0_f32)
            .with(Fact::HealthFraction, 1.0_f32)
            .with(Fact::AmmoFraction, 1.0_f32)
            .with(Fact::MemoryConfidence, 1.0_f32)
            .with(Fact::HasLastKnown, true)
    }

    #[test]
    fn test_nothing_known_patrols() {
        let plan = select(&WorldState::new().with(Fact::HealthFraction, 1.0_f32));
        assert_eq!(plan.action, ActionKind::Patrol);
        assert!(!plan.priority);
    }

    #[test]
    fn test_visible_player_engaged() {
        assert_eq!(select(&engaged()).action, ActionKind::EngageVisiblePlayer);
    }

    #[test]
    fn test_distraction_overrides_self_preservation() {
        // Badly hurt, under fire, next to cover: retreat is as cheap as it gets
        let state = engaged()
            .with(Fact::HealthFraction, 0.05_f32)
            .with(Fact::UnderFire, true)
            .with(Fact::HasCover, true)
            .with(Fact::PlayerDistracted, true);
        let plan = select(&state);
        assert_eq!(plan.action, ActionKind::AttackDistractedPlayer);
        assert!(plan.priority);
    }

    #[test]
    fn test_distracted_beats_vulnerable() {
        let state = engaged()
            .with(Fact::PlayerDistracted, true)
            .with(Fact::PlayerReloading, true);
        assert_eq!(select(&state).action, ActionKind::AttackDistractedPlayer);
    }

    #[test]
    fn test_vulnerable_without_sight() {
        let state = WorldState::new()
            .with(Fact::PlayerReloading, true)
            .with(Fact::ClearShot, true)
            .with(Fact::CanShoot, true)
            .with(Fact::Cautious, true);
        assert_eq!(select(&state).action, ActionKind::AttackVulnerablePlayer);
    }

    #[test]
    fn test_memory_only_pursues() {
        let state = WorldState::new()
            .with(Fact::HasLastKnown, true)
            .with(Fact::MemoryConfidence, 0.6_f32)
            .with(Fact::HealthFraction, 1.0_f32);
        assert_eq!(select(&state).action, ActionKind::Pursue);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let state = engaged().with(Fact::UnderFire, true).with(Fact::HasCover, true);
        let first = select(&state);
        for _ in 0..10 {
            assert_eq!(select(&state), first);
        }
    }

    #[test]
    fn test_ties_break_by_kind_order() {
        let mut tuning = CostTuning::default();
        tuning.patrol = tuning.idle;
        let plan = select_action(&WorldState::new(), &ActionLibrary::default(), &tuning).unwrap();
        assert_eq!(plan.action, ActionKind::Patrol);
    }

    #[test]
    fn test_fallback_prefers_patrol_when_admissible() {
        let library = ActionLibrary::default();
        let tuning = CostTuning::default();
        assert_eq!(
            fallback_action(&WorldState::new(), &library, &tuning).action,
            ActionKind::Patrol
        );
        assert_eq!(
            fallback_action(&engaged(), &library, &tuning).action,
            ActionKind::Idle
        );
    }
}
