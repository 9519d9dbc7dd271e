//! Configuration System
//!
//! Loads tuning parameters from a TOML file so behaviour can be adjusted
//! without recompiling. Every section and every field has a default, so a
//! tuning file only needs to name what it changes.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tactics.toml";

/// Minimum per-pair intel sharing cooldown, in seconds
pub const MIN_INTEL_COOLDOWN: f32 = 5.0;

/// Top-level configuration structure
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticsConfig {
    pub simulation: SimulationConfig,
    pub vision: VisionConfig,
    pub hearing: HearingConfig,
    pub memory: MemoryConfig,
    pub intel: IntelConfig,
    pub combat: CombatConfig,
    pub reflex: ReflexConfig,
    pub costs: CostTuning,
    pub movement: MovementConfig,
    pub cover: CoverConfig,
    pub flank: FlankConfig,
    pub corner_peek: CornerPeekConfig,
    pub avoidance: AvoidanceConfig,
    pub grenade: GrenadeConfig,
}

/// Tick rate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed ticks per second
    pub tick_rate: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { tick_rate: 60.0 }
    }
}

/// Field of view and distraction detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Maximum sight distance
    pub range: f32,
    /// Full cone angle in degrees
    pub fov_degrees: f32,
    /// Shoulder reference points sit this fraction of the player radius
    /// off the line of sight
    pub reference_spread: f32,
    /// Aim deviation (radians) beyond which the player counts as distracted
    pub distraction_threshold: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            range: 600.0,
            fov_degrees: 110.0,
            reference_spread: 0.8,
            distraction_threshold: 0.4014,
        }
    }
}

/// Sound propagation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HearingConfig {
    /// Intensity multiplier when a wall sits between source and listener
    pub wall_attenuation: f32,
    /// Received intensity below this is not heard
    pub audibility_threshold: f32,
    /// A gunshot received at least this loud puts the listener under fire
    pub under_fire_intensity: f32,
}

impl Default for HearingConfig {
    fn default() -> Self {
        Self {
            wall_attenuation: 0.45,
            audibility_threshold: 0.05,
            under_fire_intensity: 0.75,
        }
    }
}

/// Player memory confidences and decay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Confidence lost per second
    pub decay_rate: f32,
    pub visual_confidence: f32,
    pub gunshot_confidence: f32,
    /// Reload, empty click and reload complete sounds
    pub reload_confidence: f32,
    pub footstep_confidence: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.08,
            visual_confidence: 1.0,
            gunshot_confidence: 0.7,
            reload_confidence: 0.6,
            footstep_confidence: 0.4,
        }
    }
}

/// Inter-agent intel sharing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    pub radius: f32,
    /// Received confidence is the source confidence times this factor
    pub factor: f32,
    /// Seconds before the same pair may share again
    pub cooldown: f32,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            radius: 350.0,
            factor: 0.9,
            cooldown: MIN_INTEL_COOLDOWN,
        }
    }
}

/// Engagement parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Reaction latency before the first shot after spotting the player
    pub detection_delay: f32,
    /// Default seconds between shots for spawned agents
    pub weapon_cooldown: f32,
    /// Allies closer than this to the line of fire block the shot
    pub ally_clearance: f32,
    /// Allies within this radius count as nearby
    pub ally_radius: f32,
    /// Health fraction at or below which an agent counts as badly hurt
    pub low_health_fraction: f32,
    /// COMBAT closes distance when the player is farther than this
    pub engage_range: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            detection_delay: 0.35,
            weapon_cooldown: 0.1,
            ally_clearance: 18.0,
            ally_radius: 300.0,
            low_health_fraction: 0.35,
            engage_range: 380.0,
        }
    }
}

/// Reflex timer durations, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflexConfig {
    pub hit_reaction_duration: f32,
    pub reload_complete_delay: f32,
    pub under_fire_duration: f32,
    pub cautious_duration: f32,
    pub vulnerability_duration: f32,
}

impl Default for ReflexConfig {
    fn default() -> Self {
        Self {
            hit_reaction_duration: 0.8,
            reload_complete_delay: 0.2,
            under_fire_duration: 1.5,
            cautious_duration: 1.5,
            vulnerability_duration: 2.5,
        }
    }
}

/// Action cost tuning. Lower cost wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTuning {
    pub attack_distracted: f32,
    pub attack_vulnerable: f32,
    /// Every non-priority cost is clamped to at least this
    pub non_priority_floor: f32,
    pub engage_base: f32,
    pub engage_distance_weight: f32,
    pub engage_ammo_weight: f32,
    pub engage_health_weight: f32,
    /// Distance that counts as one unit in the engage distance term
    pub reference_distance: f32,
    pub retreat_base: f32,
    pub seek_cover_base: f32,
    pub hold_base: f32,
    pub flank_base: f32,
    pub flank_ally_bonus: f32,
    pub pursue_base: f32,
    /// Added to PURSUE and FLANK while being shot at
    pub under_fire_penalty: f32,
    pub patrol: f32,
    pub idle: f32,
}

impl Default for CostTuning {
    fn default() -> Self {
        Self {
            attack_distracted: 0.05,
            attack_vulnerable: 0.08,
            non_priority_floor: 0.1,
            engage_base: 1.0,
            engage_distance_weight: 0.6,
            engage_ammo_weight: 0.8,
            engage_health_weight: 0.5,
            reference_distance: 600.0,
            retreat_base: 3.0,
            seek_cover_base: 2.6,
            hold_base: 1.6,
            flank_base: 2.2,
            flank_ally_bonus: 0.5,
            pursue_base: 1.4,
            under_fire_penalty: 1.0,
            patrol: 5.0,
            idle: 10.0,
        }
    }
}

/// Locomotion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Distance at which the destination counts as reached
    pub arrive_radius: f32,
    /// Distance at which an intermediate cover hop counts as reached
    pub waypoint_radius: f32,
    /// Pause after each cover hop before reassessing
    pub settle_time: f32,
    pub agent_radius: f32,
    /// Idle scan sweep, degrees either side of the rest heading
    pub scan_amplitude_degrees: f32,
    /// Seconds for one full idle scan sweep
    pub scan_period: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 90.0,
            run_speed: 160.0,
            arrive_radius: 12.0,
            waypoint_radius: 2.0,
            settle_time: 0.4,
            agent_radius: 14.0,
            scan_amplitude_degrees: 45.0,
            scan_period: 4.0,
        }
    }
}

/// Cover discovery and scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub search_radius: f32,
    /// Used by SEEKING_COVER when nothing is found in the normal radius
    pub extended_radius: f32,
    /// Distance candidates sit from the obstacle surface
    pub offset: f32,
    pub conceal_weight: f32,
    pub goal_weight: f32,
    pub travel_weight: f32,
    pub threat_min_distance: f32,
    pub threat_penalty: f32,
    /// A cover hop must get at least this much closer to the destination
    pub min_progress: f32,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            search_radius: 320.0,
            extended_radius: 520.0,
            offset: 22.0,
            conceal_weight: 3.0,
            goal_weight: 1.0,
            travel_weight: 0.6,
            threat_min_distance: 90.0,
            threat_penalty: 2.0,
            min_progress: 10.0,
        }
    }
}

/// Flanking geometry and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlankConfig {
    pub angle_degrees: f32,
    pub distance: f32,
    /// FLANKING reverts to PURSUING after this many seconds without contact
    pub timeout: f32,
    /// Seconds after a timeout before flanking may be chosen again
    pub lockout: f32,
}

impl Default for FlankConfig {
    fn default() -> Self {
        Self {
            angle_degrees: 60.0,
            distance: 200.0,
            timeout: 6.0,
            lockout: 4.0,
        }
    }
}

/// Corner peeking while on the move
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerPeekConfig {
    /// Seconds between opening probes
    pub interval: f32,
    /// Seconds spent looking into an opening
    pub duration: f32,
    pub probe_length: f32,
    /// Probe angles off the heading, degrees, probed on both sides
    pub sample_angles_degrees: Vec<f32>,
}

impl Default for CornerPeekConfig {
    fn default() -> Self {
        Self {
            interval: 1.5,
            duration: 0.6,
            probe_length: 150.0,
            sample_angles_degrees: vec![30.0, 60.0, 90.0],
        }
    }
}

/// Short-range wall avoidance probes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    pub forward_probe: f32,
    pub side_probe: f32,
    pub side_angle_degrees: f32,
    pub weight: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            forward_probe: 60.0,
            side_probe: 45.0,
            side_angle_degrees: 35.0,
            weight: 1.5,
        }
    }
}

/// Grenade throwing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrenadeConfig {
    pub min_range: f32,
    pub max_range: f32,
    pub cooldown: f32,
    pub min_confidence: f32,
}

impl Default for GrenadeConfig {
    fn default() -> Self {
        Self {
            min_range: 120.0,
            max_range: 350.0,
            cooldown: 8.0,
            min_confidence: 0.7,
        }
    }
}

impl TacticsConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parses and validates configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::from_file(DEFAULT_TUNING_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_TUNING_PATH, e);
            Self::default()
        })
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(ok: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: reason.to_string(),
                })
            }
        }

        check(
            self.simulation.tick_rate.is_finite() && self.simulation.tick_rate > 0.0,
            "simulation.tick_rate",
            "must be a positive number",
        )?;
        check(
            self.vision.fov_degrees > 0.0 && self.vision.fov_degrees <= 360.0,
            "vision.fov_degrees",
            "must be in (0, 360]",
        )?;
        check(self.vision.range > 0.0, "vision.range", "must be positive")?;
        check(
            (0.0..=1.0).contains(&self.hearing.wall_attenuation),
            "hearing.wall_attenuation",
            "must be in [0, 1]",
        )?;
        check(
            self.memory.decay_rate >= 0.0,
            "memory.decay_rate",
            "must not be negative",
        )?;
        check(
            self.intel.factor > 0.0 && self.intel.factor <= 1.0,
            "intel.factor",
            "must be in (0, 1]",
        )?;
        check(
            self.intel.cooldown >= MIN_INTEL_COOLDOWN,
            "intel.cooldown",
            "must be at least 5 seconds",
        )?;
        check(
            self.costs.attack_distracted >= 0.0
                && self.costs.attack_vulnerable >= 0.0
                && self.costs.attack_distracted < self.costs.non_priority_floor
                && self.costs.attack_vulnerable < self.costs.non_priority_floor,
            "costs.non_priority_floor",
            "priority action costs must stay below the non-priority floor",
        )?;
        check(
            self.flank.timeout > 0.0,
            "flank.timeout",
            "must be positive",
        )?;
        check(
            self.movement.arrive_radius > 0.0,
            "movement.arrive_radius",
            "must be positive",
        )?;
        Ok(())
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TacticsConfig::default();
        assert_eq!(config.simulation.tick_rate, 60.0);
        assert_eq!(config.reflex.hit_reaction_duration, 0.8);
        assert_eq!(config.flank.angle_degrees, 60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = TacticsConfig::from_str(
            r#"
            [vision]
            range = 450.0

            [flank]
            timeout = 3.5
            "#,
        )
        .unwrap();
        assert_eq!(config.vision.range, 450.0);
        assert_eq!(config.vision.fov_degrees, 110.0);
        assert_eq!(config.flank.timeout, 3.5);
        assert_eq!(config.memory.gunshot_confidence, 0.7);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = TacticsConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = TacticsConfig::from_str(&text).unwrap();
        assert_eq!(parsed.cover.search_radius, config.cover.search_radius);
        assert_eq!(
            parsed.corner_peek.sample_angles_degrees,
            config.corner_peek.sample_angles_degrees
        );
    }

    #[test]
    fn test_shipped_tuning_file_parses() {
        let config = TacticsConfig::from_str(include_str!("../../../tactics.toml")).unwrap();
        assert_eq!(config.movement.waypoint_radius, 2.0);
        assert_eq!(config.combat.engage_range, 380.0);
        assert_eq!(config.corner_peek.sample_angles_degrees, vec![30.0, 60.0, 90.0]);
    }

    #[test]
    fn test_short_intel_cooldown_rejected() {
        let err = TacticsConfig::from_str("[intel]\ncooldown = 1.0\n").unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "intel.cooldown"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_priority_costs_must_undercut_floor() {
        let err = TacticsConfig::from_str("[costs]\nattack_distracted = 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = TacticsConfig::from_str("[vision\nrange = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
