//! Simulation Facade
//!
//! Owns the ECS world and the tick schedule. Collaborators push their inputs
//! in (player snapshot, sounds, damage, body motion, weapon status, level
//! geometry, freezes) and read intents and telemetry back out of
//! [`Simulation::tick`].

use bevy_ecs::prelude::*;
use glam::Vec2;
use std::collections::BTreeMap;

use crate::components::agent::{Agent, AgentId, Body, Dead, Frozen, Grenades, Health, WeaponStatus};
use crate::components::player::PlayerSnapshot;
use crate::config::TacticsConfig;
use crate::controller::{AgentState, DamageQueue, DamageReport, FireControl, Reflexes, TacticalState, TransitionTable};
use crate::error::SimError;
use crate::geometry::LevelGeometry;
use crate::intents::{Intent, IntentQueue, TelemetryQueue};
use crate::movement::{Navigation, PatrolRoute};
use crate::perception::{Perception, PlayerMemory, SoundEvent, SoundQueue};
use crate::schedule::{build_schedule, init_resources};
use crate::world_state::{Blackboard, WorldState};
use crate::SimClock;
use tactics_events::{AgentEvent, AgentEventKind, ResetReason, StateKind};

/// Spawn parameters for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpawn {
    pub position: Vec2,
    pub facing: Vec2,
    /// Body radius; the configured agent radius when `None`
    pub radius: Option<f32>,
    pub max_health: f32,
    pub magazine_size: u32,
    /// Seconds between shots; the configured weapon cooldown when `None`
    pub fire_cooldown: Option<f32>,
    pub grenades: u32,
    pub patrol: Vec<Vec2>,
    pub patrol_dwell: f32,
}

impl AgentSpawn {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            facing: Vec2::X,
            radius: None,
            max_health: 100.0,
            magazine_size: 30,
            fire_cooldown: None,
            grenades: 0,
            patrol: Vec::new(),
            patrol_dwell: 1.0,
        }
    }

    pub fn facing(mut self, facing: Vec2) -> Self {
        self.facing = facing;
        self
    }

    /// Looks at `point` on spawn
    pub fn facing_toward(self, point: Vec2) -> Self {
        let facing = (point - self.position).try_normalize().unwrap_or(self.facing);
        self.facing(facing)
    }

    pub fn with_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health;
        self
    }

    pub fn with_magazine(mut self, magazine_size: u32) -> Self {
        self.magazine_size = magazine_size;
        self
    }

    pub fn with_fire_cooldown(mut self, cooldown: f32) -> Self {
        self.fire_cooldown = Some(cooldown);
        self
    }

    pub fn with_grenades(mut self, count: u32) -> Self {
        self.grenades = count;
        self
    }

    /// Patrols the waypoints in a loop, pausing `dwell` seconds at each
    pub fn with_patrol(mut self, waypoints: Vec<Vec2>, dwell: f32) -> Self {
        self.patrol = waypoints;
        self.patrol_dwell = dwell;
        self
    }
}

/// Everything one tick produced
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub tick: u64,
    pub time: f64,
    /// Ordered by agent id
    pub intents: Vec<Intent>,
    /// Ordered by agent id, then production order
    pub events: Vec<AgentEvent>,
    /// Agents that died this tick
    pub deaths: Vec<AgentId>,
}

impl TickOutput {
    pub fn intents_for(&self, agent: AgentId) -> impl Iterator<Item = &Intent> + '_ {
        self.intents.iter().filter(move |intent| intent.agent() == agent)
    }

    pub fn events_for(&self, agent: AgentId) -> impl Iterator<Item = &AgentEvent> + '_ {
        self.events.iter().filter(move |event| event.agent == agent.0)
    }

    /// Whether `agent` was cleared to fire this tick
    pub fn fired(&self, agent: AgentId) -> bool {
        self.intents_for(agent).any(Intent::is_fire)
    }
}

/// The engine
pub struct Simulation {
    world: World,
    schedule: Schedule,
    agents: BTreeMap<AgentId, Entity>,
    next_id: u32,
}

impl Simulation {
    /// Builds an empty simulation. Fails if the configuration does not
    /// validate.
    pub fn new(config: TacticsConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut world = World::new();
        init_resources(&mut world, config);
        Ok(Self {
            world,
            schedule: build_schedule(),
            agents: BTreeMap::new(),
            next_id: 0,
        })
    }

    pub fn with_defaults() -> Self {
        let mut world = World::new();
        init_resources(&mut world, TacticsConfig::default());
        Self {
            world,
            schedule: build_schedule(),
            agents: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &TacticsConfig {
        self.world.resource::<TacticsConfig>()
    }

    pub fn clock(&self) -> &SimClock {
        self.world.resource::<SimClock>()
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    /// Spawns an agent. Ids are handed out in spawn order. Agents with a
    /// patrol start in PATROL, the rest in IDLE.
    pub fn spawn_agent(&mut self, spawn: AgentSpawn) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;

        let config = self.world.resource::<TacticsConfig>();
        let radius = spawn.radius.unwrap_or(config.movement.agent_radius);
        let cooldown = spawn.fire_cooldown.unwrap_or(config.combat.weapon_cooldown);
        let now = self.world.resource::<SimClock>().time;

        let body = Body::new(spawn.position, spawn.facing, radius);
        let initial = if spawn.patrol.is_empty() {
            AgentState::Idle
        } else {
            AgentState::Patrol
        };

        let mut entity = self.world.spawn((
            Agent,
            id,
            body,
            Health::new(spawn.max_health),
            WeaponStatus::full(spawn.magazine_size),
            FireControl::new(cooldown),
            Grenades::new(spawn.grenades),
            Reflexes::default(),
            PlayerMemory::new(),
            Perception::default(),
            Blackboard::default(),
            TacticalState::new(initial, now),
            Navigation::new(body.facing),
        ));
        if !spawn.patrol.is_empty() {
            entity.insert(PatrolRoute::new(spawn.patrol, spawn.patrol_dwell));
        }
        let entity = entity.id();

        self.agents.insert(id, entity);
        tracing::debug!(agent = %id, position = ?spawn.position, state = %initial.kind(), "agent spawned");
        id
    }

    fn entity(&self, id: AgentId) -> Result<Entity, SimError> {
        self.agents.get(&id).copied().ok_or(SimError::UnknownAgent(id))
    }

    fn component<T: Component + Clone>(&self, id: AgentId) -> Result<T, SimError> {
        let entity = self.entity(id)?;
        self.world
            .get::<T>(entity)
            .cloned()
            .ok_or(SimError::UnknownAgent(id))
    }

    fn component_mut<T: Component>(&mut self, id: AgentId) -> Result<Mut<'_, T>, SimError> {
        let entity = self.entity(id)?;
        self.world
            .get_mut::<T>(entity)
            .ok_or(SimError::UnknownAgent(id))
    }

    fn record(&mut self, agent: AgentId, kind: AgentEventKind) {
        let clock = self.world.resource::<SimClock>().clone();
        self.world
            .resource_mut::<TelemetryQueue>()
            .record(&clock, agent, kind);
    }

    /// Sets or clears the player snapshot for the coming tick
    pub fn set_player(&mut self, player: Option<PlayerSnapshot>) {
        match player {
            Some(snapshot) => self.world.insert_resource(snapshot),
            None => {
                self.world.remove_resource::<PlayerSnapshot>();
            }
        }
    }

    /// Replaces the level geometry. `None` leaves agents blind.
    pub fn set_geometry(&mut self, geometry: Option<LevelGeometry>) {
        match geometry {
            Some(geometry) => self.world.insert_resource(geometry),
            None => {
                self.world.remove_resource::<LevelGeometry>();
            }
        }
    }

    pub fn geometry(&self) -> Option<&LevelGeometry> {
        self.world.get_resource::<LevelGeometry>()
    }

    /// Marks an obstacle destroyed. False when there is no such obstacle.
    pub fn deactivate_obstacle(&mut self, index: usize) -> bool {
        self.world
            .get_resource_mut::<LevelGeometry>()
            .map_or(false, |mut geometry| geometry.deactivate(index))
    }

    pub fn set_transition_table(&mut self, table: TransitionTable) {
        self.world.insert_resource(table);
    }

    /// Broadcasts a sound for the coming tick
    pub fn emit_sound(&mut self, event: SoundEvent) {
        self.world.resource_mut::<SoundQueue>().push(event);
    }

    /// Queues damage taken by `agent` for the coming tick
    pub fn report_damage(&mut self, agent: AgentId, report: DamageReport) -> Result<(), SimError> {
        self.entity(agent)?;
        self.world.resource_mut::<DamageQueue>().push(agent, report);
        Ok(())
    }

    /// Physics writes back where the body ended up
    pub fn set_agent_motion(&mut self, agent: AgentId, position: Vec2, velocity: Vec2) -> Result<(), SimError> {
        let mut body = self.component_mut::<Body>(agent)?;
        body.position = position;
        body.velocity = velocity;
        Ok(())
    }

    pub fn set_weapon_status(&mut self, agent: AgentId, status: WeaponStatus) -> Result<(), SimError> {
        *self.component_mut::<WeaponStatus>(agent)? = status;
        Ok(())
    }

    /// Suspends `agent`: no perception, timers, planning or intents
    pub fn begin_freeze(&mut self, agent: AgentId) -> Result<(), SimError> {
        let entity = self.entity(agent)?;
        self.world.entity_mut(entity).insert(Frozen);
        Ok(())
    }

    pub fn begin_freeze_all(&mut self) {
        for agent in self.agent_ids() {
            if let Ok(entity) = self.entity(agent) {
                self.world.entity_mut(entity).insert(Frozen);
            }
        }
    }

    /// Resumes `agent`. Whatever it knew about the player before the freeze
    /// can no longer be trusted: memory, heard vulnerability, pending reload
    /// reflex, caution and the current route are all dropped.
    pub fn end_freeze(&mut self, agent: AgentId) -> Result<(), SimError> {
        let entity = self.entity(agent)?;
        let was_frozen = self.world.entity_mut(entity).take::<Frozen>().is_some();
        if was_frozen && self.world.get::<Dead>(entity).is_none() {
            self.component_mut::<PlayerMemory>(agent)?.invalidate();
            self.component_mut::<Perception>(agent)?.forget();
            self.component_mut::<Reflexes>(agent)?.forget_after_freeze();
            self.component_mut::<Navigation>(agent)?.clear();
            self.record(
                agent,
                AgentEventKind::MemoryReset {
                    reason: ResetReason::FreezeEnded,
                },
            );
            tracing::info!(%agent, "freeze ended, memory reset");
        }
        Ok(())
    }

    pub fn end_freeze_all(&mut self) {
        for agent in self.agent_ids() {
            if let Err(err) = self.end_freeze(agent) {
                tracing::warn!(%agent, %err, "could not end freeze");
            }
        }
    }

    /// Wipes every live agent's memory (rewind, scripted reset)
    pub fn invalidate_memories(&mut self) {
        for agent in self.agent_ids() {
            let Ok(entity) = self.entity(agent) else {
                continue;
            };
            if self.world.get::<Dead>(entity).is_some() {
                continue;
            }
            if let Some(mut memory) = self.world.get_mut::<PlayerMemory>(entity) {
                memory.invalidate();
            }
            self.record(
                agent,
                AgentEventKind::MemoryReset {
                    reason: ResetReason::Invalidated,
                },
            );
        }
        tracing::info!(agents = self.agents.len(), "memories invalidated");
    }

    /// Puts an agent straight into `state`, bypassing the transition table.
    /// For scripted setups.
    pub fn force_state(&mut self, agent: AgentId, state: AgentState) -> Result<(), SimError> {
        let now = self.world.resource::<SimClock>().time;
        *self.component_mut::<TacticalState>(agent)? = TacticalState::new(state, now);
        Ok(())
    }

    /// Runs one fixed tick and collects what it produced
    pub fn tick(&mut self) -> TickOutput {
        self.schedule.run(&mut self.world);

        let (tick, time) = {
            let clock = self.world.resource::<SimClock>();
            (clock.tick, clock.time)
        };
        let intents = self.world.resource_mut::<IntentQueue>().drain();
        let (events, deaths) = {
            let mut telemetry = self.world.resource_mut::<TelemetryQueue>();
            (telemetry.drain_events(), telemetry.drain_deaths())
        };
        self.world.resource_mut::<SimClock>().advance();

        TickOutput {
            tick,
            time,
            intents,
            events,
            deaths,
        }
    }

    /// Runs `ticks` ticks, keeping every output
    pub fn run(&mut self, ticks: u64) -> Vec<TickOutput> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    pub fn state(&self, agent: AgentId) -> Result<AgentState, SimError> {
        Ok(self.component::<TacticalState>(agent)?.state)
    }

    pub fn state_kind(&self, agent: AgentId) -> Result<StateKind, SimError> {
        Ok(self.state(agent)?.kind())
    }

    pub fn memory(&self, agent: AgentId) -> Result<PlayerMemory, SimError> {
        self.component::<PlayerMemory>(agent)
    }

    pub fn world_state(&self, agent: AgentId) -> Result<WorldState, SimError> {
        Ok(self.component::<Blackboard>(agent)?.world_state)
    }

    pub fn body(&self, agent: AgentId) -> Result<Body, SimError> {
        self.component::<Body>(agent)
    }

    pub fn facing(&self, agent: AgentId) -> Result<Vec2, SimError> {
        Ok(self.body(agent)?.facing)
    }

    pub fn health(&self, agent: AgentId) -> Result<Health, SimError> {
        self.component::<Health>(agent)
    }

    pub fn reflexes(&self, agent: AgentId) -> Result<Reflexes, SimError> {
        self.component::<Reflexes>(agent)
    }

    pub fn perception(&self, agent: AgentId) -> Result<Perception, SimError> {
        self.component::<Perception>(agent)
    }

    /// Waypoint the agent is currently walking to, if any
    pub fn waypoint(&self, agent: AgentId) -> Result<Option<Vec2>, SimError> {
        Ok(self.component::<Navigation>(agent)?.waypoint)
    }

    pub fn is_dead(&self, agent: AgentId) -> Result<bool, SimError> {
        let entity = self.entity(agent)?;
        Ok(self.world.get::<Dead>(entity).is_some())
    }

    pub fn is_frozen(&self, agent: AgentId) -> Result<bool, SimError> {
        let entity = self.entity(agent)?;
        Ok(self.world.get::<Frozen>(entity).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_spawn_order() {
        let mut sim = Simulation::with_defaults();
        let a = sim.spawn_agent(AgentSpawn::at(Vec2::ZERO));
        let b = sim.spawn_agent(AgentSpawn::at(Vec2::new(50.0, 0.0)).with_patrol(vec![Vec2::ZERO], 1.0));
        assert_eq!((a, b), (AgentId(0), AgentId(1)));
        assert_eq!(sim.state_kind(a).unwrap(), StateKind::Idle);
        assert_eq!(sim.state_kind(b).unwrap(), StateKind::Patrol);
    }

    #[test]
    fn test_unknown_agent() {
        let mut sim = Simulation::with_defaults();
        let err = sim
            .report_damage(
                AgentId(9),
                DamageReport {
                    amount: 1.0,
                    attacker_direction: Vec2::X,
                },
            )
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownAgent(AgentId(9))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = TacticsConfig::default();
        config.intel.cooldown = 2.0;
        assert!(matches!(Simulation::new(config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_clock_advances_per_tick() {
        let mut sim = Simulation::with_defaults();
        let first = sim.tick();
        let second = sim.tick();
        assert_eq!((first.tick, second.tick), (0, 1));
        assert_eq!(first.time, 0.0);
        assert_eq!(sim.clock().tick, 2);
    }

    #[test]
    fn test_idle_agent_holds_and_aims() {
        let mut sim = Simulation::with_defaults();
        let id = sim.spawn_agent(AgentSpawn::at(Vec2::ZERO));
        let output = sim.tick();
        let intents: Vec<_> = output.intents_for(id).collect();
        assert_eq!(intents.len(), 2);
        assert!(matches!(intents[0], Intent::Move { speed, .. } if *speed == 0.0));
        assert!(matches!(intents[1], Intent::Aim { .. }));
    }
}
