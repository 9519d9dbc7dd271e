//! Skirmish Harness
//!
//! Runs the engine headless in a walled arena against a scripted player.
//! The harness stands in for the physics, weapon and player collaborators:
//! it moves bodies along the move intents, keeps magazines, and turns the
//! player's shots into sounds and damage.

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tactics_core::controller::DamageReport;
use tactics_core::geometry::{LevelGeometry, Obstacle, SurfaceKind};
use tactics_core::perception::{SoundCategory, SoundEvent, SoundSource};
use tactics_core::{
    AgentId, AgentSpawn, Intent, PlayerSnapshot, Simulation, TacticsConfig, TickOutput, Vec2,
    WeaponStatus,
};
use tactics_events::EventLog;

/// Command line arguments for the harness
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Runs tactical agents against a scripted player")]
struct Args {
    /// Random seed for the scripted player
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 1800)]
    ticks: u64,

    /// Number of agents to spawn
    #[arg(long, default_value_t = 4)]
    agents: u32,

    /// Tuning file (TOML). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write telemetry to this JSONL file
    #[arg(long)]
    events: Option<PathBuf>,
}

const ARENA_HALF: Vec2 = Vec2::new(640.0, 420.0);
const WALL_THICKNESS: f32 = 24.0;

const PLAYER_SPEED: f32 = 130.0;
const PLAYER_MAGAZINE: u32 = 12;
const PLAYER_SHOT_INTERVAL: f32 = 0.3;
const PLAYER_RELOAD_TIME: f32 = 1.6;
const PLAYER_HIT_CHANCE: f64 = 0.25;
const PLAYER_DAMAGE: f32 = 18.0;
const PLAYER_MAX_HEALTH: f32 = 200.0;

const AGENT_MAGAZINE: u32 = 20;
const AGENT_RELOAD_TIME: f32 = 1.2;
const AGENT_HIT_CHANCE: f64 = 0.15;
const AGENT_DAMAGE: f32 = 6.0;

const GUNSHOT_RADIUS: f32 = 900.0;
const RELOAD_RADIUS: f32 = 320.0;
const FOOTSTEP_RADIUS: f32 = 180.0;
const FOOTSTEP_INTERVAL: f32 = 0.45;

/// Open floor with a few crates, a concrete pillar and a glass partition
fn build_arena() -> LevelGeometry {
    let mut level = LevelGeometry::arena(ARENA_HALF, WALL_THICKNESS);
    level.add(Obstacle::wall(Vec2::new(-260.0, -40.0), Vec2::new(-200.0, 140.0)));
    level.add(Obstacle::wall(Vec2::new(180.0, -160.0), Vec2::new(260.0, -100.0)));
    level.add(Obstacle::wall(Vec2::new(-60.0, 180.0), Vec2::new(60.0, 230.0)));
    level.add(Obstacle::wall(Vec2::new(320.0, 120.0), Vec2::new(380.0, 260.0)));
    level.add(Obstacle::new(
        Vec2::new(-420.0, -260.0),
        Vec2::new(-410.0, -120.0),
        SurfaceKind::Glass,
    ));
    level
}

/// Patrol loop for the `index`th agent, one quadrant each
fn patrol_for(index: u32) -> Vec<Vec2> {
    let sx = if index % 2 == 0 { 1.0 } else { -1.0 };
    let sy = if (index / 2) % 2 == 0 { 1.0 } else { -1.0 };
    let corner = |x: f32, y: f32| Vec2::new(sx * x, sy * y);
    vec![
        corner(520.0, 330.0),
        corner(420.0, 60.0),
        corner(140.0, 330.0),
    ]
}

/// The human stand-in: wanders, looks around, shoots at whoever it can see
struct ScriptedPlayer {
    position: Vec2,
    heading: Vec2,
    aim: Vec2,
    health: f32,
    ammo: u32,
    reload_timer: f32,
    shot_timer: f32,
    turn_timer: f32,
    footstep_timer: f32,
    /// When false the player looks along its heading instead of at an agent
    hunting: bool,
    hits_taken: u32,
    deaths: u32,
}

impl ScriptedPlayer {
    fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            heading: Vec2::X,
            aim: Vec2::X * 100.0,
            health: PLAYER_MAX_HEALTH,
            ammo: PLAYER_MAGAZINE,
            reload_timer: 0.0,
            shot_timer: 0.0,
            turn_timer: 0.0,
            footstep_timer: 0.0,
            hunting: true,
            hits_taken: 0,
            deaths: 0,
        }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot::new(self.position, self.aim)
    }

    fn walk(&mut self, rng: &mut SmallRng, level: &LevelGeometry, dt: f32) {
        self.turn_timer -= dt;
        if self.turn_timer <= 0.0 {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            self.heading = Vec2::from_angle(angle);
            self.hunting = rng.gen_bool(0.6);
            self.turn_timer = rng.gen_range(1.0..3.5);
        }
        let next = self.position + self.heading * PLAYER_SPEED * dt;
        if level.point_free(next, PlayerSnapshot::DEFAULT_RADIUS) {
            self.position = next;
        } else {
            self.heading = -self.heading;
        }
    }

    /// Closest living agent the player has line of sight to
    fn target<'a>(&self, level: &LevelGeometry, agents: &'a [(AgentId, Vec2)]) -> Option<&'a (AgentId, Vec2)> {
        agents
            .iter()
            .filter(|(_, position)| !level.is_blocked(self.position, *position))
            .min_by(|a, b| {
                a.1.distance_squared(self.position)
                    .total_cmp(&b.1.distance_squared(self.position))
            })
    }

    /// Aims, fires and reloads. Every noise goes to the engine as a sound.
    fn act(
        &mut self,
        rng: &mut SmallRng,
        sim: &mut Simulation,
        level: &LevelGeometry,
        agents: &[(AgentId, Vec2)],
        dt: f32,
    ) {
        let target = self.target(level, agents).copied();
        self.aim = match (self.hunting, target) {
            (true, Some((_, position))) => position,
            _ => self.position + self.heading * 100.0,
        };

        self.footstep_timer -= dt;
        if self.footstep_timer <= 0.0 {
            sim.emit_sound(SoundEvent::player(self.position, SoundCategory::Footstep, 0.5, FOOTSTEP_RADIUS));
            self.footstep_timer = FOOTSTEP_INTERVAL;
        }

        if self.reload_timer > 0.0 {
            self.reload_timer -= dt;
            if self.reload_timer <= 0.0 {
                self.ammo = PLAYER_MAGAZINE;
                sim.emit_sound(SoundEvent::player(self.position, SoundCategory::ReloadComplete, 0.8, RELOAD_RADIUS));
            }
            return;
        }

        self.shot_timer -= dt;
        let Some((victim, victim_position)) = target.filter(|_| self.hunting) else {
            return;
        };
        if self.shot_timer > 0.0 {
            return;
        }
        if self.ammo == 0 {
            sim.emit_sound(SoundEvent::player(self.position, SoundCategory::EmptyClick, 0.4, RELOAD_RADIUS));
            sim.emit_sound(SoundEvent::player(self.position, SoundCategory::Reload, 0.6, RELOAD_RADIUS));
            self.reload_timer = PLAYER_RELOAD_TIME;
            return;
        }

        self.ammo -= 1;
        self.shot_timer = PLAYER_SHOT_INTERVAL;
        sim.emit_sound(SoundEvent::player(self.position, SoundCategory::Gunshot, 1.0, GUNSHOT_RADIUS));
        if rng.gen_bool(PLAYER_HIT_CHANCE) {
            let report = DamageReport {
                amount: PLAYER_DAMAGE,
                attacker_direction: self.position - victim_position,
            };
            if let Err(err) = sim.report_damage(victim, report) {
                tracing::warn!(%err, "damage report rejected");
            }
        }
    }
}

/// Magazine and reload timer the harness keeps for one agent
#[derive(Debug, Clone, Copy)]
struct Armory {
    status: WeaponStatus,
    reload_timer: f32,
}

/// Applies one tick of intents: moves bodies, spends ammo, resolves shots
fn apply_intents(
    output: &TickOutput,
    sim: &mut Simulation,
    rng: &mut SmallRng,
    level: &LevelGeometry,
    player: &mut ScriptedPlayer,
    armory: &mut BTreeMap<AgentId, Armory>,
    dt: f32,
) {
    for intent in &output.intents {
        match *intent {
            Intent::Move { agent, direction, speed } => {
                let Ok(body) = sim.body(agent) else {
                    continue;
                };
                let velocity = direction * speed;
                let next = body.position + velocity * dt;
                let (position, velocity) = if level.point_free(next, body.radius) {
                    (next, velocity)
                } else {
                    (body.position, Vec2::ZERO)
                };
                if let Err(err) = sim.set_agent_motion(agent, position, velocity) {
                    tracing::warn!(%agent, %err, "motion rejected");
                }
            }
            Intent::Fire(order) => {
                let Some(weapon) = armory.get_mut(&order.agent) else {
                    continue;
                };
                weapon.status.ammo = weapon.status.ammo.saturating_sub(1);
                let Ok(body) = sim.body(order.agent) else {
                    continue;
                };
                sim.emit_sound(SoundEvent {
                    origin: body.position,
                    category: SoundCategory::Gunshot,
                    intensity: 1.0,
                    propagation_radius: GUNSHOT_RADIUS,
                    occluded: false,
                    source: SoundSource::Agent(order.agent),
                });
                let exposed = !level.is_blocked(body.position, player.position);
                if exposed && rng.gen_bool(AGENT_HIT_CHANCE) {
                    player.health -= AGENT_DAMAGE;
                    player.hits_taken += 1;
                }
            }
            Intent::Reload { agent } => {
                if let Some(weapon) = armory.get_mut(&agent) {
                    if weapon.reload_timer <= 0.0 {
                        weapon.status.ready = false;
                        weapon.reload_timer = AGENT_RELOAD_TIME;
                    }
                }
            }
            Intent::Throw { agent, target } => {
                tracing::info!(%agent, target = ?target, "grenade out");
            }
            Intent::Aim { .. } => {}
        }
    }

    for (agent, weapon) in armory.iter_mut() {
        if weapon.reload_timer > 0.0 {
            weapon.reload_timer -= dt;
            if weapon.reload_timer <= 0.0 {
                weapon.status = WeaponStatus::full(weapon.status.magazine_size);
            }
        }
        if let Err(err) = sim.set_weapon_status(*agent, weapon.status) {
            tracing::warn!(%agent, %err, "weapon status rejected");
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => TacticsConfig::from_file(path)?,
        None => TacticsConfig::default(),
    };
    let dt = 1.0 / config.simulation.tick_rate;

    tracing::info!(seed = args.seed, ticks = args.ticks, agents = args.agents, "skirmish starting");

    let mut sim = Simulation::new(config)?;
    let level = build_arena();
    sim.set_geometry(Some(level.clone()));

    let mut armory = BTreeMap::new();
    for index in 0..args.agents {
        let route = patrol_for(index);
        let start = route[0];
        let id = sim.spawn_agent(
            AgentSpawn::at(start)
                .facing_toward(Vec2::ZERO)
                .with_magazine(AGENT_MAGAZINE)
                .with_grenades(1)
                .with_patrol(route, 1.5),
        );
        armory.insert(
            id,
            Armory {
                status: WeaponStatus::full(AGENT_MAGAZINE),
                reload_timer: 0.0,
            },
        );
    }

    let mut log = match &args.events {
        Some(path) => EventLog::create(path)?,
        None => EventLog::null(),
    };

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let mut player = ScriptedPlayer::new();
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut fallen: Vec<AgentId> = Vec::new();

    for _ in 0..args.ticks {
        let living: Vec<(AgentId, Vec2)> = sim
            .agent_ids()
            .into_iter()
            .filter(|id| !fallen.contains(id))
            .filter_map(|id| sim.body(id).ok().map(|body| (id, body.position)))
            .collect();

        player.walk(&mut rng, &level, dt);
        player.act(&mut rng, &mut sim, &level, &living, dt);
        sim.set_player(Some(player.snapshot()));

        let output = sim.tick();
        for event in &output.events {
            *counts.entry(event.kind.label()).or_default() += 1;
        }
        log.log_batch(&output.events)?;
        fallen.extend(output.deaths.iter().copied());
        for agent in &output.deaths {
            tracing::info!(%agent, tick = output.tick, "agent down");
        }

        apply_intents(&output, &mut sim, &mut rng, &level, &mut player, &mut armory, dt);

        if player.health <= 0.0 {
            player.deaths += 1;
            tracing::info!(tick = output.tick, "player down, respawning");
            player = ScriptedPlayer {
                deaths: player.deaths,
                hits_taken: player.hits_taken,
                ..ScriptedPlayer::new()
            };
            // Nobody saw where the new player came from
            sim.invalidate_memories();
        }
        if fallen.len() == armory.len() {
            tracing::info!(tick = output.tick, "all agents down");
            break;
        }
    }
    log.flush()?;

    tracing::info!(
        ticks = sim.clock().tick,
        events = log.event_count(),
        player_hits = player.hits_taken,
        player_deaths = player.deaths,
        agents_down = fallen.len(),
        "skirmish finished"
    );
    for (label, count) in &counts {
        tracing::info!(event = label, count, "event totals");
    }
    for id in sim.agent_ids() {
        let state = sim.state_kind(id)?;
        let health = sim.health(id)?;
        tracing::info!(agent = %id, %state, health = health.current, "final state");
    }
    Ok(())
}
