//! Intents and Telemetry Queues
//!
//! The engine never moves bodies or fires weapons itself. Each tick it
//! queues intents for the body, physics and weapon collaborators, and
//! telemetry records for whoever is listening. Both queues are drained by
//! [`crate::sim::Simulation::tick`].

use bevy_ecs::prelude::*;
use glam::Vec2;
use std::mem;

use crate::components::agent::AgentId;
use crate::controller::FireOrder;
use crate::SimClock;
use tactics_events::{AgentEvent, AgentEventKind};

/// What an agent wants its collaborators to do this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Walk along a unit `direction`; zero speed holds position
    Move {
        agent: AgentId,
        direction: Vec2,
        speed: f32,
    },
    /// Turn to face a unit `direction`
    Aim { agent: AgentId, direction: Vec2 },
    /// Shoot once, already cleared by fire control
    Fire(FireOrder),
    Throw { agent: AgentId, target: Vec2 },
    Reload { agent: AgentId },
}

impl Intent {
    pub fn agent(&self) -> AgentId {
        match self {
            Intent::Move { agent, .. }
            | Intent::Aim { agent, .. }
            | Intent::Throw { agent, .. }
            | Intent::Reload { agent } => *agent,
            Intent::Fire(order) => order.agent,
        }
    }

    pub fn is_fire(&self) -> bool {
        matches!(self, Intent::Fire(_))
    }
}

/// Intents produced during the current tick
#[derive(Resource, Debug, Default)]
pub struct IntentQueue {
    pending: Vec<Intent>,
}

impl IntentQueue {
    pub fn push(&mut self, intent: Intent) {
        self.pending.push(intent);
    }

    /// Takes every queued intent, ordered by agent id. Each agent's intents
    /// keep the order they were produced in.
    pub fn drain(&mut self) -> Vec<Intent> {
        let mut intents = mem::take(&mut self.pending);
        intents.sort_by_key(Intent::agent);
        intents
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Telemetry and death notifications waiting for the tick output
#[derive(Resource, Debug, Default)]
pub struct TelemetryQueue {
    events: Vec<AgentEvent>,
    deaths: Vec<AgentId>,
}

impl TelemetryQueue {
    /// Records an event stamped with the clock's tick and time
    pub fn record(&mut self, clock: &SimClock, agent: AgentId, kind: AgentEventKind) {
        self.events
            .push(AgentEvent::new(clock.tick, clock.time, agent.0, kind));
    }

    pub fn record_death(&mut self, agent: AgentId) {
        self.deaths.push(agent);
    }

    /// Takes every event, ordered by agent id and then production order
    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        let mut events = mem::take(&mut self.events);
        events.sort_by_key(|event| event.agent);
        events
    }

    pub fn drain_deaths(&mut self) -> Vec<AgentId> {
        let mut deaths = mem::take(&mut self.deaths);
        deaths.sort();
        deaths
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.deaths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_sorted_by_agent_stably() {
        let mut queue = IntentQueue::default();
        queue.push(Intent::Reload { agent: AgentId(2) });
        queue.push(Intent::Move {
            agent: AgentId(1),
            direction: Vec2::X,
            speed: 90.0,
        });
        queue.push(Intent::Aim {
            agent: AgentId(2),
            direction: Vec2::Y,
        });
        queue.push(Intent::Aim {
            agent: AgentId(1),
            direction: Vec2::X,
        });

        let drained = queue.drain();
        let order: Vec<_> = drained.iter().map(|i| i.agent().0).collect();
        assert_eq!(order, vec![1, 1, 2, 2]);
        assert!(matches!(drained[0], Intent::Move { .. }));
        assert!(matches!(drained[2], Intent::Reload { .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_telemetry_stamped_with_clock() {
        let mut clock = SimClock::new(50.0);
        clock.advance();
        let mut telemetry = TelemetryQueue::default();
        telemetry.record(&clock, AgentId(4), AgentEventKind::Died);
        telemetry.record(&clock, AgentId(1), AgentEventKind::Died);
        telemetry.record_death(AgentId(4));

        let events = telemetry.drain_events();
        assert_eq!(events[0].agent, 1);
        assert_eq!(events[1].tick, 1);
        assert!((events[1].time - 0.02).abs() < 1e-6);
        assert_eq!(telemetry.drain_deaths(), vec![AgentId(4)]);
        assert!(telemetry.is_empty());
    }
}
