//! Hearing
//!
//! Sound events broadcast by the weapon and reload collaborators land in an
//! append-only [`SoundQueue`]. Every listener reads the whole queue during
//! the tick; the frame-end system clears it.

use bevy_ecs::prelude::*;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::agent::AgentId;
use crate::config::{HearingConfig, MemoryConfig};
use crate::geometry::LevelGeometry;

/// What made the noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCategory {
    Gunshot,
    Reload,
    EmptyClick,
    ReloadComplete,
    Footstep,
}

impl SoundCategory {
    /// Memory confidence a sound of this category is worth
    pub fn confidence(self, config: &MemoryConfig) -> f32 {
        match self {
            SoundCategory::Gunshot => config.gunshot_confidence,
            SoundCategory::Reload | SoundCategory::EmptyClick | SoundCategory::ReloadComplete => {
                config.reload_confidence
            }
            SoundCategory::Footstep => config.footstep_confidence,
        }
    }
}

/// Who made the noise. Only player sounds feed player memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundSource {
    Player,
    Agent(AgentId),
    World,
}

/// One broadcast sound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub origin: Vec2,
    pub category: SoundCategory,
    /// Intensity at the origin, usually 0.0 to 1.0
    pub intensity: f32,
    /// Distance at which the sound fades to nothing
    pub propagation_radius: f32,
    /// The emitter already knows the sound is muffled
    pub occluded: bool,
    pub source: SoundSource,
}

impl SoundEvent {
    /// An unoccluded sound made by the player
    pub fn player(origin: Vec2, category: SoundCategory, intensity: f32, propagation_radius: f32) -> Self {
        Self {
            origin,
            category,
            intensity,
            propagation_radius,
            occluded: false,
            source: SoundSource::Player,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.intensity.is_finite() && self.propagation_radius.is_finite()
    }
}

/// Append-only sound queue shared by all listeners for one tick
#[derive(Resource, Debug, Default)]
pub struct SoundQueue {
    events: Vec<SoundEvent>,
}

impl SoundQueue {
    pub fn push(&mut self, event: SoundEvent) {
        self.events.push(event);
    }

    /// Every sound emitted this tick, in emission order
    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Frame-end reset
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// A sound that reached a listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeardSound {
    pub origin: Vec2,
    pub category: SoundCategory,
    pub source: SoundSource,
    /// Intensity after falloff and attenuation
    pub received: f32,
}

/// Intensity of `event` at `listener`.
///
/// Linear falloff to zero at the propagation radius. Walls muffle but never
/// silence: a flagged or geometrically blocked path is scaled by
/// `wall_attenuation`.
pub fn received_intensity(
    event: &SoundEvent,
    listener: Vec2,
    geometry: Option<&LevelGeometry>,
    wall_attenuation: f32,
) -> f32 {
    if event.propagation_radius <= 0.0 {
        return 0.0;
    }
    let distance = event.origin.distance(listener);
    if distance >= event.propagation_radius {
        return 0.0;
    }
    let mut received = event.intensity * (1.0 - distance / event.propagation_radius);
    let walled = event.occluded
        || geometry.map_or(false, |geometry| geometry.is_blocked(event.origin, listener));
    if walled {
        received *= wall_attenuation;
    }
    received.max(0.0)
}

/// Sounds audible at `listener`, in emission order
pub fn listen(
    events: &[SoundEvent],
    listener: Vec2,
    geometry: Option<&LevelGeometry>,
    config: &HearingConfig,
) -> Vec<HeardSound> {
    events
        .iter()
        .filter(|event| event.is_finite())
        .filter_map(|event| {
            let received = received_intensity(event, listener, geometry, config.wall_attenuation);
            (received >= config.audibility_threshold).then_some(HeardSound {
                origin: event.origin,
                category: event.category,
                source: event.source,
                received,
            })
        })
        .collect()
}
