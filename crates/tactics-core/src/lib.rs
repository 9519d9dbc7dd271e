//! Agent Cognition & Tactical Movement Engine
//!
//! Decision-making core for the enemies of a real-time top-down shooter.
//! Every fixed tick each agent perceives the player (vision, hearing,
//! shared intel), rebuilds a symbolic world state, picks the cheapest
//! admissible action, runs it through a state machine with reflex
//! overrides, and turns the result into move/aim/fire/throw intents.
//!
//! The engine is a `bevy_ecs` world driven by [`sim::Simulation`]; the
//! physics, weapon and player collaborators live outside it.

use bevy_ecs::prelude::*;

pub mod actions;
pub mod components;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod intents;
pub mod movement;
pub mod perception;
pub mod planner;
pub mod schedule;
pub mod sim;
pub mod systems;
pub mod world_state;

pub use components::*;
pub use config::TacticsConfig;
pub use error::{AgentError, SimError};
pub use intents::Intent;
pub use sim::{AgentSpawn, Simulation, TickOutput};

pub use glam::Vec2;
pub use tactics_events::{AgentEvent, AgentEventKind, StateKind};

/// Fixed-rate simulation clock
#[derive(Resource, Debug, Clone)]
pub struct SimClock {
    /// Index of the tick currently being simulated
    pub tick: u64,
    /// Seconds since the simulation started, `tick * dt`
    pub time: f64,
    /// Seconds per tick
    pub dt: f32,
}

impl SimClock {
    pub fn new(tick_rate: f32) -> Self {
        Self {
            tick: 0,
            time: 0.0,
            dt: 1.0 / tick_rate,
        }
    }

    /// Move to the next tick. Time is derived from the tick index so it
    /// never drifts.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.time = self.tick as f64 * self.dt as f64;
    }
}
