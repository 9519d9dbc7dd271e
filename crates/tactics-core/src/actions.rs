//! Action Library
//!
//! Immutable action definitions shared read-only by every agent. Each action
//! has symbolic preconditions, symbolic effects and a cost computed from the
//! world state alone, so the same state always yields the same costs.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{CostTuning, TacticsConfig};
use crate::world_state::{Fact, FactValue, WorldState};
use tactics_events::StateKind;

/// Cost shaping constants not exposed in the tuning file
pub mod cost_constants {
    /// Engage distance term saturates at this many reference distances
    pub const ENGAGE_DISTANCE_CAP: f32 = 2.0;

    pub const RETREAT_DAMAGE_WEIGHT: f32 = 2.0;
    pub const RETREAT_UNDER_FIRE_BONUS: f32 = 0.8;
    pub const RETREAT_CANNOT_SHOOT_BONUS: f32 = 1.2;

    pub const SEEK_COVER_DAMAGE_WEIGHT: f32 = 1.5;
    pub const SEEK_COVER_UNDER_FIRE_BONUS: f32 = 0.8;
    pub const SEEK_COVER_CANNOT_SHOOT_BONUS: f32 = 0.6;

    pub const HOLD_HEALTH_WEIGHT: f32 = 0.5;

    /// Allies counted toward the flank discount
    pub const FLANK_MAX_ALLIES: f32 = 2.0;
    pub const FLANK_CONFIDENCE_WEIGHT: f32 = 0.3;
    /// FLANK needs a memory at least this fresh
    pub const FLANK_MIN_CONFIDENCE: f32 = 0.5;

    pub const PURSUE_UNCERTAINTY_WEIGHT: f32 = 1.0;
}

use cost_constants::*;

/// Every action, declared in tie-break order: when two admissible actions
/// cost the same, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AttackDistractedPlayer,
    AttackVulnerablePlayer,
    EngageVisiblePlayer,
    Retreat,
    SeekCover,
    HoldUnderFire,
    Flank,
    Pursue,
    Patrol,
    Idle,
}

impl ActionKind {
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::AttackDistractedPlayer,
            ActionKind::AttackVulnerablePlayer,
            ActionKind::EngageVisiblePlayer,
            ActionKind::Retreat,
            ActionKind::SeekCover,
            ActionKind::HoldUnderFire,
            ActionKind::Flank,
            ActionKind::Pursue,
            ActionKind::Patrol,
            ActionKind::Idle,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::AttackDistractedPlayer => "attack_distracted_player",
            ActionKind::AttackVulnerablePlayer => "attack_vulnerable_player",
            ActionKind::EngageVisiblePlayer => "engage_visible_player",
            ActionKind::Retreat => "retreat",
            ActionKind::SeekCover => "seek_cover",
            ActionKind::HoldUnderFire => "hold_under_fire",
            ActionKind::Flank => "flank",
            ActionKind::Pursue => "pursue",
            ActionKind::Patrol => "patrol",
            ActionKind::Idle => "idle",
        }
    }

    /// Priority actions are evaluated before everything else and override
    /// whatever the agent is doing.
    pub fn is_priority(self) -> bool {
        matches!(
            self,
            ActionKind::AttackDistractedPlayer | ActionKind::AttackVulnerablePlayer
        )
    }

    /// State the controller enters to carry the action out
    pub fn target_state(self) -> StateKind {
        match self {
            ActionKind::AttackDistractedPlayer | ActionKind::AttackVulnerablePlayer => {
                StateKind::Assault
            }
            ActionKind::EngageVisiblePlayer => StateKind::Combat,
            ActionKind::Retreat => StateKind::Retreating,
            ActionKind::SeekCover => StateKind::SeekingCover,
            ActionKind::HoldUnderFire => StateKind::Suppressed,
            ActionKind::Flank => StateKind::Flanking,
            ActionKind::Pursue => StateKind::Pursuing,
            ActionKind::Patrol => StateKind::Patrol,
            ActionKind::Idle => StateKind::Idle,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbolic precondition over the world state
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Boolean fact equals the value (absent reads false)
    Is(Fact, bool),
    /// Numeric fact present and at least the bound
    AtLeast(Fact, f32),
    /// Numeric fact present and at most the bound
    AtMost(Fact, f32),
    /// Any one of the alternatives holds
    Any(Vec<Condition>),
}

impl Condition {
    pub fn holds(&self, state: &WorldState) -> bool {
        match self {
            Condition::Is(fact, value) => state.flag(*fact) == *value,
            Condition::AtLeast(fact, bound) => state.number(*fact).map_or(false, |n| n >= *bound),
            Condition::AtMost(fact, bound) => state.number(*fact).map_or(false, |n| n <= *bound),
            Condition::Any(options) => options.iter().any(|c| c.holds(state)),
        }
    }
}

/// Cost function over the world state
pub type CostFn = fn(&WorldState, &CostTuning) -> f32;

/// One entry of the action library
#[derive(Debug, Clone)]
pub struct Action {
    pub kind: ActionKind,
    pub preconditions: Vec<Condition>,
    /// Facts the action is meant to bring about. Informational: the planner
    /// is single-step and never applies them.
    pub effects: Vec<(Fact, FactValue)>,
    cost_fn: CostFn,
}

impl Action {
    pub fn new(kind: ActionKind, preconditions: Vec<Condition>, effects: Vec<(Fact, FactValue)>, cost_fn: CostFn) -> Self {
        Self {
            kind,
            preconditions,
            effects,
            cost_fn,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_admissible(&self, state: &WorldState) -> bool {
        self.preconditions.iter().all(|c| c.holds(state))
    }

    /// Cost of the action in `state`. Non-priority costs never drop below
    /// the tuning floor, so the priority actions always undercut them.
    /// A non-finite cost comes back as infinity.
    pub fn cost(&self, state: &WorldState, tuning: &CostTuning) -> f32 {
        let raw = (self.cost_fn)(state, tuning);
        if !raw.is_finite() {
            return f32::INFINITY;
        }
        if self.kind.is_priority() {
            raw.max(0.0)
        } else {
            raw.max(tuning.non_priority_floor)
        }
    }
}

/// Read-only catalogue of actions, in [`ActionKind`] order
#[derive(Resource, Debug, Clone)]
pub struct ActionLibrary {
    actions: Vec<Action>,
}

fn flag(state: &WorldState, fact: Fact) -> f32 {
    if state.flag(fact) {
        1.0
    } else {
        0.0
    }
}

fn health(state: &WorldState) -> f32 {
    state.number_or(Fact::HealthFraction, 1.0)
}

fn confidence(state: &WorldState) -> f32 {
    state.number_or(Fact::MemoryConfidence, 0.0)
}

fn attack_distracted_cost(_: &WorldState, t: &CostTuning) -> f32 {
    t.attack_distracted
}

fn attack_vulnerable_cost(_: &WorldState, t: &CostTuning) -> f32 {
    t.attack_vulnerable
}

fn engage_cost(s: &WorldState, t: &CostTuning) -> f32 {
    let reference = t.reference_distance.max(1.0);
    let distance = s.number_or(Fact::PlayerDistance, reference * ENGAGE_DISTANCE_CAP);
    t.engage_base
        + t.engage_distance_weight * (distance / reference).min(ENGAGE_DISTANCE_CAP)
        + t.engage_ammo_weight * (1.0 - s.number_or(Fact::AmmoFraction, 1.0))
        + t.engage_health_weight * (1.0 - health(s))
}

fn retreat_cost(s: &WorldState, t: &CostTuning) -> f32 {
    t.retreat_base
        - RETREAT_DAMAGE_WEIGHT * (1.0 - health(s))
        - RETREAT_UNDER_FIRE_BONUS * flag(s, Fact::UnderFire)
        - RETREAT_CANNOT_SHOOT_BONUS * (1.0 - flag(s, Fact::CanShoot))
}

fn seek_cover_cost(s: &WorldState, t: &CostTuning) -> f32 {
    t.seek_cover_base
        - SEEK_COVER_DAMAGE_WEIGHT * (1.0 - health(s))
        - SEEK_COVER_UNDER_FIRE_BONUS * flag(s, Fact::UnderFire)
        - SEEK_COVER_CANNOT_SHOOT_BONUS * (1.0 - flag(s, Fact::CanShoot))
}

fn hold_cost(s: &WorldState, t: &CostTuning) -> f32 {
    t.hold_base + HOLD_HEALTH_WEIGHT * health(s)
}

fn flank_cost(s: &WorldState, t: &CostTuning) -> f32 {
    let allies = s.number_or(Fact::AlliesNearby, 0.0).clamp(0.0, FLANK_MAX_ALLIES);
    t.flank_base - t.flank_ally_bonus * allies - FLANK_CONFIDENCE_WEIGHT * confidence(s)
        + t.under_fire_penalty * flag(s, Fact::UnderFire)
}

fn pursue_cost(s: &WorldState, t: &CostTuning) -> f32 {
    t.pursue_base
        + PURSUE_UNCERTAINTY_WEIGHT * (1.0 - confidence(s))
        + t.under_fire_penalty * flag(s, Fact::UnderFire)
}

fn patrol_cost(_: &WorldState, t: &CostTuning) -> f32 {
    t.patrol
}

fn idle_cost(_: &WorldState, t: &CostTuning) -> f32 {
    t.idle
}

impl ActionLibrary {
    /// The standard catalogue
    pub fn standard(config: &TacticsConfig) -> Self {
        use self::Condition::*;
        use Fact::*;

        let low_health = config.combat.low_health_fraction;
        let on = FactValue::Bool(true);
        let off = FactValue::Bool(false);

        let actions = vec![
            Action::new(
                ActionKind::AttackDistractedPlayer,
                vec![Is(PlayerVisible, true), Is(PlayerDistracted, true)],
                vec![(PlayerDistracted, off)],
                attack_distracted_cost,
            ),
            Action::new(
                ActionKind::AttackVulnerablePlayer,
                vec![
                    Any(vec![Is(PlayerReloading, true), Is(PlayerAmmoEmpty, true)]),
                    Is(ClearShot, true),
                ],
                vec![(PlayerReloading, off), (PlayerAmmoEmpty, off)],
                attack_vulnerable_cost,
            ),
            Action::new(
                ActionKind::EngageVisiblePlayer,
                vec![Is(PlayerVisible, true), Is(Cautious, false)],
                vec![(ClearShot, on)],
                engage_cost,
            ),
            Action::new(
                ActionKind::Retreat,
                vec![
                    Is(HasCover, true),
                    Any(vec![
                        Is(UnderFire, true),
                        Is(CanShoot, false),
                        AtMost(HealthFraction, low_health),
                        Is(Cautious, true),
                    ]),
                ],
                vec![(InCover, on), (UnderFire, off)],
                retreat_cost,
            ),
            Action::new(
                ActionKind::SeekCover,
                vec![
                    Is(HasCover, false),
                    Any(vec![Is(UnderFire, true), Is(PlayerVisible, true), Is(Cautious, true)]),
                ],
                vec![(HasCover, on), (InCover, on)],
                seek_cover_cost,
            ),
            Action::new(
                ActionKind::HoldUnderFire,
                vec![Is(UnderFire, true), Is(InCover, true)],
                vec![(UnderFire, off)],
                hold_cost,
            ),
            Action::new(
                ActionKind::Flank,
                vec![
                    Is(PlayerVisible, false),
                    Is(HasLastKnown, true),
                    Is(FlankAvailable, true),
                    Is(Cautious, false),
                    AtLeast(MemoryConfidence, FLANK_MIN_CONFIDENCE),
                ],
                vec![(PlayerVisible, on), (FlankAvailable, off)],
                flank_cost,
            ),
            Action::new(
                ActionKind::Pursue,
                vec![Is(PlayerVisible, false), Is(HasLastKnown, true), Is(Cautious, false)],
                vec![(PlayerVisible, on)],
                pursue_cost,
            ),
            Action::new(
                ActionKind::Patrol,
                vec![Is(PlayerVisible, false), Is(HasLastKnown, false)],
                vec![(HasLastKnown, on)],
                patrol_cost,
            ),
            Action::new(ActionKind::Idle, vec![], vec![], idle_cost),
        ];

        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn get(&self, kind: ActionKind) -> Option<&Action> {
        self.actions.iter().find(|a| a.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionLibrary {
    fn default() -> Self {
        Self::standard(&TacticsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ActionLibrary {
        ActionLibrary::default()
    }

    fn cost(kind: ActionKind, state: &WorldState) -> f32 {
        library().get(kind).unwrap().cost(state, &CostTuning::default())
    }

    fn admissible(kind: ActionKind, state: &WorldState) -> bool {
        library().get(kind).unwrap().is_admissible(state)
    }

    #[test]
    fn test_library_follows_kind_order() {
        let kinds: Vec<_> = library().actions().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, ActionKind::all());
    }

    #[test]
    fn test_distracted_ignores_weapon_readiness() {
        let state = WorldState::new()
            .with(Fact::PlayerVisible, true)
            .with(Fact::PlayerDistracted, true)
            .with(Fact::CanShoot, false);
        assert!(admissible(ActionKind::AttackDistractedPlayer, &state));
        let hidden = state.with(Fact::PlayerVisible, false);
        assert!(!admissible(ActionKind::AttackDistractedPlayer, &hidden));
    }

    #[test]
    fn test_vulnerable_accepts_either_flag() {
        let base = WorldState::new()
            .with(Fact::ClearShot, true)
            .with(Fact::CanShoot, false);
        assert!(!admissible(ActionKind::AttackVulnerablePlayer, &base));
        assert!(admissible(
            ActionKind::AttackVulnerablePlayer,
            &base.clone().with(Fact::PlayerReloading, true)
        ));
        assert!(admissible(
            ActionKind::AttackVulnerablePlayer,
            &base.with(Fact::PlayerAmmoEmpty, true)
        ));
    }

    #[test]
    fn test_engage_cost_grows_with_distance_and_wear() {
        let near = WorldState::new()
            .with(Fact::PlayerDistance, 100.0_f32)
            .with(Fact::AmmoFraction, 1.0_f32)
            .with(Fact::HealthFraction, 1.0_f32);
        let far = near.clone().with(Fact::PlayerDistance, 500.0_f32);
        let worn = near.clone().with(Fact::AmmoFraction, 0.2_f32);
        assert!(cost(ActionKind::EngageVisiblePlayer, &far) > cost(ActionKind::EngageVisiblePlayer, &near));
        assert!(cost(ActionKind::EngageVisiblePlayer, &worn) > cost(ActionKind::EngageVisiblePlayer, &near));
    }

    #[test]
    fn test_cautious_blocks_aggression_only() {
        let state = WorldState::new()
            .with(Fact::PlayerVisible, true)
            .with(Fact::PlayerDistracted, true)
            .with(Fact::CanShoot, true)
            .with(Fact::Cautious, true);
        assert!(!admissible(ActionKind::EngageVisiblePlayer, &state));
        assert!(admissible(ActionKind::AttackDistractedPlayer, &state));
        assert!(admissible(ActionKind::SeekCover, &state));
    }

    #[test]
    fn test_retreat_on_low_health() {
        let state = WorldState::new()
            .with(Fact::HasCover, true)
            .with(Fact::CanShoot, true)
            .with(Fact::HealthFraction, 0.3_f32);
        assert!(admissible(ActionKind::Retreat, &state));
        let healthy = state.with(Fact::HealthFraction, 0.9_f32);
        assert!(!admissible(ActionKind::Retreat, &healthy));
    }

    #[test]
    fn test_non_priority_costs_respect_floor() {
        let desperate = WorldState::new()
            .with(Fact::HealthFraction, 0.0_f32)
            .with(Fact::UnderFire, true)
            .with(Fact::CanShoot, false);
        let floor = CostTuning::default().non_priority_floor;
        assert_eq!(cost(ActionKind::Retreat, &desperate), floor);
        assert_eq!(cost(ActionKind::SeekCover, &desperate), floor);
        assert!(cost(ActionKind::AttackDistractedPlayer, &desperate) < floor);
        assert!(cost(ActionKind::AttackVulnerablePlayer, &desperate) < floor);
    }

    #[test]
    fn test_flank_cheaper_with_allies() {
        let alone = WorldState::new()
            .with(Fact::MemoryConfidence, 0.9_f32)
            .with(Fact::AlliesNearby, 0.0_f32);
        let backed = alone.clone().with(Fact::AlliesNearby, 2.0_f32);
        assert!(cost(ActionKind::Flank, &backed) < cost(ActionKind::Flank, &alone));
        assert!(cost(ActionKind::Flank, &backed) < cost(ActionKind::Pursue, &backed));
    }

    #[test]
    fn test_pursue_cost_rises_as_confidence_falls() {
        let fresh = WorldState::new().with(Fact::MemoryConfidence, 1.0_f32);
        let old = WorldState::new().with(Fact::MemoryConfidence, 0.2_f32);
        assert!(cost(ActionKind::Pursue, &old) > cost(ActionKind::Pursue, &fresh));
    }

    #[test]
    fn test_target_states() {
        assert_eq!(ActionKind::AttackVulnerablePlayer.target_state(), StateKind::Assault);
        assert_eq!(ActionKind::HoldUnderFire.target_state(), StateKind::Suppressed);
        assert!(ActionKind::all()
            .iter()
            .all(|k| k.target_state() != StateKind::Dead));
    }
}
