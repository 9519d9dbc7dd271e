//! Execution Systems
//!
//! Turns each agent's state into move, fire, throw and reload intents,
//! resolves facing, and closes the tick.

use bevy_ecs::prelude::*;
use glam::Vec2;

use crate::components::agent::{AgentId, Body, Grenades, WeaponStatus};
use crate::config::TacticsConfig;
use crate::controller::facing::{resolve, scan_direction};
use crate::controller::{AgentState, FacingInputs, FireControl, Reflexes, TacticalState};
use crate::error::AgentError;
use crate::geometry::LevelGeometry;
use crate::intents::{Intent, IntentQueue, TelemetryQueue};
use crate::movement::avoidance::avoid_walls;
use crate::movement::corner::detect_opening;
use crate::movement::cover::{find_best_cover, CoverQuery};
use crate::movement::{Navigation, PatrolRoute, PatrolStep, Step};
use crate::perception::hearing::SoundQueue;
use crate::perception::{Perception, PlayerMemory};
use crate::systems::{report, Live};
use crate::world_state::{Blackboard, Fact};
use crate::SimClock;
use tactics_events::{AgentEventKind, Reflex, StateKind};

/// Locomotion for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
struct Motion {
    direction: Vec2,
    speed: f32,
}

impl Motion {
    const HOLD: Motion = Motion {
        direction: Vec2::ZERO,
        speed: 0.0,
    };

    fn is_moving(&self) -> bool {
        self.speed > 0.0 && self.direction != Vec2::ZERO
    }
}

struct Surroundings<'a> {
    clock: &'a SimClock,
    config: &'a TacticsConfig,
    geometry: Option<&'a LevelGeometry>,
}

/// Walks the cover-to-cover route toward `destination`. Never overshoots a
/// waypoint in one tick. Falls back to wall avoidance when no route exists.
fn travel(
    navigation: &mut Navigation,
    body: &Body,
    destination: Vec2,
    threat: Option<Vec2>,
    speed: f32,
    ctx: &Surroundings,
) -> Motion {
    let config = ctx.config;
    let dt = ctx.clock.dt;
    navigation.set_destination(destination, config.movement.arrive_radius);
    let step = navigation.advance(
        body.position,
        ctx.geometry,
        threat,
        body.radius,
        &config.movement,
        &config.cover,
        dt,
    );
    match step {
        Step::Move { waypoint, direction } => Motion {
            direction,
            speed: speed.min(body.position.distance(waypoint) / dt),
        },
        Step::Settle | Step::Arrived => Motion::HOLD,
        Step::Blocked => match ctx.geometry {
            Some(geometry) => Motion {
                direction: avoid_walls(
                    geometry,
                    body.position,
                    destination - body.position,
                    &config.avoidance,
                ),
                speed: config.movement.walk_speed,
            },
            None => Motion::HOLD,
        },
    }
}

fn hold(navigation: &mut Navigation) -> Motion {
    navigation.clear();
    navigation.settle_timer = 0.0;
    Motion::HOLD
}

/// Closes distance to a visible player beyond engagement range
fn engage(navigation: &mut Navigation, body: &Body, visible: Option<Vec2>, ctx: &Surroundings) -> Motion {
    match visible {
        Some(player) if player.distance(body.position) > ctx.config.combat.engage_range => {
            travel(navigation, body, player, Some(player), ctx.config.movement.run_speed, ctx)
        }
        _ => hold(navigation),
    }
}

/// Cover for SEEKING_COVER: the world state's pick, else a wider search
fn seek_cover(blackboard: &Blackboard, body: &Body, threat: Vec2, ctx: &Surroundings) -> Option<Vec2> {
    if let Some(cover) = blackboard.cover {
        return Some(cover.position);
    }
    let geometry = ctx.geometry?;
    find_best_cover(
        geometry,
        &CoverQuery {
            origin: body.position,
            threat,
            goal: body.position,
            radius: ctx.config.cover.extended_radius,
            body_radius: body.radius,
        },
        &ctx.config.cover,
    )
    .map(|cover| cover.position)
}

/// Pulls back from `threat` along whatever direction the walls allow
fn flee(navigation: &mut Navigation, body: &Body, threat: Vec2, ctx: &Surroundings) -> Motion {
    navigation.clear();
    let away = body.position - threat;
    let direction = match ctx.geometry {
        Some(geometry) => avoid_walls(geometry, body.position, away, &ctx.config.avoidance),
        None => away.normalize_or_zero(),
    };
    Motion {
        direction,
        speed: ctx.config.movement.run_speed,
    }
}

/// Everything one agent's execution reads and writes
struct Actor<'a> {
    id: AgentId,
    body: &'a Body,
    state: &'a TacticalState,
    blackboard: &'a Blackboard,
    perception: &'a Perception,
    memory: &'a PlayerMemory,
    weapon: &'a WeaponStatus,
    reflexes: &'a mut Reflexes,
    navigation: &'a mut Navigation,
    fire: &'a mut FireControl,
    grenades: &'a mut Grenades,
    patrol: Option<&'a mut PatrolRoute>,
}

fn execute(
    actor: Actor,
    ctx: &Surroundings,
    intents: &mut IntentQueue,
    telemetry: &mut TelemetryQueue,
) -> Result<(), AgentError> {
    let Actor {
        id,
        body,
        state,
        blackboard,
        perception,
        memory,
        weapon,
        reflexes,
        navigation,
        fire,
        grenades,
        patrol,
    } = actor;
    if !body.is_finite() {
        return Err(AgentError::NonFinite { what: "agent body" });
    }

    let config = ctx.config;
    let position = body.position;
    let visible = perception
        .player_position
        .filter(|_| perception.player_visible);
    let remembered = memory.suspected_position();
    let target = visible.or(remembered);

    let (motion, wants_fire) = match state.state {
        AgentState::Idle | AgentState::Suppressed | AgentState::Dead => (hold(navigation), false),
        AgentState::Patrol => {
            let step = patrol.map_or(PatrolStep::Empty, |route| {
                route.update(position, config.movement.arrive_radius, ctx.clock.dt)
            });
            let motion = match step {
                PatrolStep::Walk(waypoint) => {
                    travel(navigation, body, waypoint, None, config.movement.walk_speed, ctx)
                }
                PatrolStep::Dwell | PatrolStep::Empty => hold(navigation),
            };
            (motion, false)
        }
        AgentState::Combat => (engage(navigation, body, visible, ctx), visible.is_some()),
        AgentState::Assault => (engage(navigation, body, visible, ctx), target.is_some()),
        AgentState::Retreating => {
            let motion = match blackboard.cover {
                Some(cover) => travel(navigation, body, cover.position, target, config.movement.run_speed, ctx),
                None => hold(navigation),
            };
            (motion, false)
        }
        AgentState::SeekingCover => {
            let motion = match target {
                Some(threat) => match seek_cover(blackboard, body, threat, ctx) {
                    Some(cover) => travel(navigation, body, cover, Some(threat), config.movement.run_speed, ctx),
                    None => flee(navigation, body, threat, ctx),
                },
                None => hold(navigation),
            };
            (motion, false)
        }
        AgentState::Pursuing => {
            let motion = match memory.require_position() {
                Ok(last_known) => travel(navigation, body, last_known, None, config.movement.run_speed, ctx),
                Err(err) => {
                    report(id, "pursue", &err);
                    hold(navigation)
                }
            };
            (motion, false)
        }
        AgentState::Flanking { target: flank_target, anchor, .. } => {
            let threat = remembered.unwrap_or(anchor);
            let motion = travel(navigation, body, flank_target, Some(threat), config.movement.run_speed, ctx);
            (motion, false)
        }
    };

    intents.push(Intent::Move {
        agent: id,
        direction: motion.direction,
        speed: motion.speed,
    });

    // Corner peeks while walking the beat or chasing a lead
    let peeking_state = matches!(state.kind(), StateKind::Patrol | StateKind::Pursuing);
    if peeking_state && motion.is_moving() && reflexes.peek().is_none() && reflexes.peek_cooldown <= 0.0 {
        if let Some(geometry) = ctx.geometry {
            let peek = &config.corner_peek;
            match detect_opening(
                geometry,
                position,
                motion.direction,
                peek.probe_length,
                &peek.sample_angles_degrees,
            ) {
                Some(direction) => {
                    reflexes.start_peek(direction, peek.duration, peek.interval);
                    telemetry.record(
                        ctx.clock,
                        id,
                        AgentEventKind::ReflexTriggered {
                            reflex: Reflex::CornerPeek,
                        },
                    );
                }
                None => reflexes.peek_cooldown = peek.interval,
            }
        }
    }

    let clear_shot = blackboard.world_state.flag(Fact::ClearShot);
    if let (true, true, Some(aim)) = (wants_fire, clear_shot, target) {
        if !reflexes.detection_pending() {
            match fire.request(id, weapon, aim - position, ctx.clock.time) {
                Ok(order) => {
                    intents.push(Intent::Fire(order));
                    telemetry.record(
                        ctx.clock,
                        id,
                        AgentEventKind::Fired {
                            direction: order.direction.to_array(),
                        },
                    );
                }
                Err(rejection) => {
                    tracing::trace!(agent = %id, %rejection, "fire rejected");
                }
            }
        }
    }

    let grenade_state = matches!(
        state.kind(),
        StateKind::SeekingCover | StateKind::Suppressed | StateKind::Pursuing
    );
    let grenade = &config.grenade;
    if grenade_state
        && grenades.ready()
        && !perception.player_visible
        && memory.confidence() >= grenade.min_confidence
    {
        if let Some(spot) = remembered {
            let range = spot.distance(position);
            if range >= grenade.min_range && range <= grenade.max_range {
                grenades.count -= 1;
                grenades.cooldown_remaining = grenade.cooldown;
                intents.push(Intent::Throw {
                    agent: id,
                    target: spot,
                });
                telemetry.record(
                    ctx.clock,
                    id,
                    AgentEventKind::GrenadeThrown {
                        target: spot.to_array(),
                    },
                );
            }
        }
    }

    if weapon.needs_reload() {
        intents.push(Intent::Reload { agent: id });
    }
    Ok(())
}

/// Runs every live agent's current state
#[allow(clippy::too_many_arguments)]
#[allow(clippy::type_complexity)]
pub fn execute_states(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    geometry: Option<Res<LevelGeometry>>,
    mut intents: ResMut<IntentQueue>,
    mut telemetry: ResMut<TelemetryQueue>,
    mut query: Query<
        (
            &AgentId,
            &Body,
            &TacticalState,
            &Blackboard,
            &Perception,
            &PlayerMemory,
            &WeaponStatus,
            &mut Reflexes,
            &mut Navigation,
            &mut FireControl,
            &mut Grenades,
            Option<&mut PatrolRoute>,
        ),
        Live,
    >,
) {
    let ctx = Surroundings {
        clock: &clock,
        config: &config,
        geometry: geometry.as_deref(),
    };

    for (
        id,
        body,
        state,
        blackboard,
        perception,
        memory,
        weapon,
        mut reflexes,
        mut navigation,
        mut fire,
        mut grenades,
        mut patrol,
    ) in query.iter_mut()
    {
        let actor = Actor {
            id: *id,
            body,
            state,
            blackboard,
            perception,
            memory,
            weapon,
            reflexes: &mut reflexes,
            navigation: &mut navigation,
            fire: &mut fire,
            grenades: &mut grenades,
            patrol: patrol.as_deref_mut(),
        };
        if let Err(err) = execute(actor, &ctx, &mut intents, &mut telemetry) {
            report(*id, "execute", &err);
        }
    }
}

/// Applies the facing rules and emits the aim intent
#[allow(clippy::type_complexity)]
pub fn resolve_facing(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    mut intents: ResMut<IntentQueue>,
    mut query: Query<
        (
            &AgentId,
            &TacticalState,
            &Reflexes,
            &Perception,
            &PlayerMemory,
            &Navigation,
            &mut Body,
        ),
        Live,
    >,
) {
    let amplitude = config.movement.scan_amplitude_degrees.to_radians();

    for (id, state, reflexes, perception, memory, navigation, mut body) in query.iter_mut() {
        if !body.is_finite() {
            report(*id, "facing", &AgentError::NonFinite { what: "agent body" });
            continue;
        }
        let flank_focus = match state.state {
            AgentState::Flanking { anchor, .. } => Some(memory.suspected_position().unwrap_or(anchor)),
            _ => None,
        };
        let inputs = FacingInputs {
            position: body.position,
            current: body.facing,
            hit_reaction: reflexes.hit_reaction(),
            visible_player: perception
                .player_position
                .filter(|_| perception.player_visible),
            flank_focus,
            peek: reflexes.peek(),
            velocity: body.velocity,
            scan: scan_direction(
                navigation.rest_heading,
                amplitude,
                config.movement.scan_period,
                clock.time,
            ),
        };
        let (facing, rule) = resolve(&inputs);
        if body.facing != facing {
            body.facing = facing;
        }
        tracing::trace!(agent = %id, ?rule, "facing resolved");
        intents.push(Intent::Aim {
            agent: *id,
            direction: facing,
        });
    }
}

/// Frame end: the sound queue only lives for one tick
pub fn finish_tick(mut sounds: ResMut<SoundQueue>) {
    sounds.clear();
}
