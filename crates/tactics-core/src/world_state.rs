//! World State
//!
//! Symbolic per-agent facts rebuilt from perception and agent status every
//! tick. Actions read the world state but never write it.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::actions::ActionKind;
use crate::movement::cover::CoverPoint;

/// Names of the facts the planner reasons over
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fact {
    PlayerVisible,
    PlayerDistracted,
    PlayerReloading,
    PlayerAmmoEmpty,
    ClearShot,
    HasCover,
    InCover,
    UnderFire,
    CanShoot,
    HasLastKnown,
    Cautious,
    FlankAvailable,
    HasGrenade,
    /// Memory confidence, 0.0 to 1.0
    MemoryConfidence,
    /// Distance to the seen or remembered player; absent when unknown
    PlayerDistance,
    HealthFraction,
    AmmoFraction,
    /// Live allies within the ally radius
    AlliesNearby,
}

impl Fact {
    pub fn name(self) -> &'static str {
        match self {
            Fact::PlayerVisible => "player_visible",
            Fact::PlayerDistracted => "player_distracted",
            Fact::PlayerReloading => "player_reloading",
            Fact::PlayerAmmoEmpty => "player_ammo_empty",
            Fact::ClearShot => "clear_shot",
            Fact::HasCover => "has_cover",
            Fact::InCover => "in_cover",
            Fact::UnderFire => "under_fire",
            Fact::CanShoot => "can_shoot",
            Fact::HasLastKnown => "has_last_known",
            Fact::Cautious => "cautious",
            Fact::FlankAvailable => "flank_available",
            Fact::HasGrenade => "has_grenade",
            Fact::MemoryConfidence => "memory_confidence",
            Fact::PlayerDistance => "player_distance",
            Fact::HealthFraction => "health_fraction",
            Fact::AmmoFraction => "ammo_fraction",
            Fact::AlliesNearby => "allies_nearby",
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a fact
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(f32),
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Bool(value)
    }
}

impl From<f32> for FactValue {
    fn from(value: f32) -> Self {
        FactValue::Number(value)
    }
}

/// Ordered fact map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    facts: BTreeMap<Fact, FactValue>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, fact: Fact, value: impl Into<FactValue>) -> Self {
        self.set(fact, value);
        self
    }

    pub fn set(&mut self, fact: Fact, value: impl Into<FactValue>) {
        self.facts.insert(fact, value.into());
    }

    pub fn get(&self, fact: Fact) -> Option<FactValue> {
        self.facts.get(&fact).copied()
    }

    /// Boolean fact; absent or numeric facts read as false
    pub fn flag(&self, fact: Fact) -> bool {
        matches!(self.facts.get(&fact), Some(FactValue::Bool(true)))
    }

    /// Numeric fact, if present
    pub fn number(&self, fact: Fact) -> Option<f32> {
        match self.facts.get(&fact) {
            Some(FactValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn number_or(&self, fact: Fact, default: f32) -> f32 {
        self.number(fact).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Fact, FactValue)> + '_ {
        self.facts.iter().map(|(fact, value)| (*fact, *value))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Builds the world state from this tick's observations.
    pub fn from_observations(obs: &Observations) -> Self {
        let mut state = WorldState::new()
            .with(Fact::PlayerVisible, obs.player_visible)
            .with(Fact::PlayerDistracted, obs.player_visible && obs.player_distracted)
            .with(Fact::PlayerReloading, obs.player_reloading)
            .with(Fact::PlayerAmmoEmpty, obs.player_ammo_empty)
            .with(Fact::ClearShot, obs.clear_shot)
            .with(Fact::HasCover, obs.has_cover)
            .with(Fact::InCover, obs.in_cover)
            .with(Fact::UnderFire, obs.under_fire)
            .with(Fact::CanShoot, obs.can_shoot)
            .with(Fact::HasLastKnown, obs.memory_confidence > 0.0)
            .with(Fact::Cautious, obs.cautious)
            .with(Fact::FlankAvailable, obs.flank_available)
            .with(Fact::HasGrenade, obs.has_grenade)
            .with(Fact::MemoryConfidence, obs.memory_confidence.clamp(0.0, 1.0))
            .with(Fact::HealthFraction, obs.health_fraction.clamp(0.0, 1.0))
            .with(Fact::AmmoFraction, obs.ammo_fraction.clamp(0.0, 1.0))
            .with(Fact::AlliesNearby, obs.allies_nearby as f32);
        if let Some(distance) = obs.player_distance {
            state.set(Fact::PlayerDistance, distance);
        }
        state
    }
}

/// Raw per-tick inputs to [`WorldState::from_observations`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    pub player_visible: bool,
    pub player_distracted: bool,
    pub player_reloading: bool,
    pub player_ammo_empty: bool,
    pub clear_shot: bool,
    pub has_cover: bool,
    pub in_cover: bool,
    pub under_fire: bool,
    pub can_shoot: bool,
    pub cautious: bool,
    pub flank_available: bool,
    pub has_grenade: bool,
    pub memory_confidence: f32,
    pub player_distance: Option<f32>,
    pub health_fraction: f32,
    pub ammo_fraction: f32,
    pub allies_nearby: u32,
}

/// Per-agent planning scratchpad: this tick's world state, the last chosen
/// action and the cover point found while building the state.
#[derive(Component, Debug, Clone, Default)]
pub struct Blackboard {
    pub world_state: WorldState,
    pub last_action: Option<ActionKind>,
    pub cover: Option<CoverPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_facts_read_false() {
        let state = WorldState::new().with(Fact::HealthFraction, 0.5_f32);
        assert!(!state.flag(Fact::PlayerVisible));
        assert!(!state.flag(Fact::HealthFraction));
        assert_eq!(state.number(Fact::HealthFraction), Some(0.5));
        assert_eq!(state.number(Fact::PlayerDistance), None);
        assert_eq!(state.number_or(Fact::PlayerDistance, 9.0), 9.0);
    }

    #[test]
    fn test_distraction_requires_visibility() {
        let state = WorldState::from_observations(&Observations {
            player_distracted: true,
            ..Default::default()
        });
        assert!(!state.flag(Fact::PlayerDistracted));
    }

    #[test]
    fn test_last_known_follows_confidence() {
        let state = WorldState::from_observations(&Observations {
            memory_confidence: 0.3,
            player_distance: Some(120.0),
            allies_nearby: 2,
            ..Default::default()
        });
        assert!(state.flag(Fact::HasLastKnown));
        assert_eq!(state.number(Fact::PlayerDistance), Some(120.0));
        assert_eq!(state.number(Fact::AlliesNearby), Some(2.0));

        let stale = WorldState::from_observations(&Observations::default());
        assert!(!stale.flag(Fact::HasLastKnown));
        assert!(stale.number(Fact::PlayerDistance).is_none());
    }

    #[test]
    fn test_facts_iterate_in_order() {
        let state = WorldState::new()
            .with(Fact::AmmoFraction, 1.0_f32)
            .with(Fact::PlayerVisible, true);
        let names: Vec<_> = state.iter().map(|(fact, _)| fact.name()).collect();
        assert_eq!(names, vec!["player_visible", "ammo_fraction"]);
    }
}
