//! Decision Systems
//!
//! Rebuilds each agent's world state, fires the timed reflexes and runs the
//! planner through the state controller.

use bevy_ecs::prelude::*;
use glam::Vec2;

use crate::actions::{ActionKind, ActionLibrary};
use crate::components::agent::{AgentId, Body, Grenades, Health, WeaponStatus};
use crate::config::TacticsConfig;
use crate::controller::reflex::reload_downgrade;
use crate::controller::{self, AgentState, Reflexes, StateChange, TacticalState, TransitionTable};
use crate::error::AgentError;
use crate::geometry::{LevelGeometry, RayMask};
use crate::intents::TelemetryQueue;
use crate::movement::cover::{find_best_cover, in_cover, CoverQuery};
use crate::movement::flank::choose_side;
use crate::perception::{Perception, PlayerMemory};
use crate::planner::{fallback_action, select_action};
use crate::systems::{report, Live, Roster};
use crate::world_state::{Blackboard, Fact, Observations, WorldState};
use crate::SimClock;
use tactics_events::{AgentEventKind, Reflex, StateKind, TransitionCause};

/// Writes one `StateChanged` record per hop
pub(crate) fn record_changes(
    telemetry: &mut TelemetryQueue,
    clock: &SimClock,
    agent: AgentId,
    changes: &[StateChange],
) {
    for change in changes {
        tracing::debug!(
            %agent,
            from = %change.from,
            to = %change.to,
            cause = ?change.cause,
            "state changed"
        );
        telemetry.record(
            clock,
            agent,
            AgentEventKind::StateChanged {
                from: change.from,
                to: change.to,
                cause: change.cause,
            },
        );
    }
}

/// Read-only context shared by every agent's world state build
struct Surroundings<'a> {
    config: &'a TacticsConfig,
    geometry: Option<&'a LevelGeometry>,
    roster: &'a Roster,
}

/// Agent status feeding one world state build
struct AgentView<'a> {
    id: AgentId,
    body: &'a Body,
    health: &'a Health,
    weapon: &'a WeaponStatus,
    grenades: &'a Grenades,
    perception: &'a Perception,
    memory: &'a PlayerMemory,
    reflexes: &'a Reflexes,
}

fn clear_shot(view: &AgentView, target: Vec2, ctx: &Surroundings) -> bool {
    let from = view.body.position;
    let walled = ctx
        .geometry
        .map_or(false, |g| g.raycast(from, target, RayMask::All).is_some());
    !walled
        && !ctx
            .roster
            .ally_in_line(view.id, from, target, ctx.config.combat.ally_clearance)
}

fn build_world_state(view: &AgentView, ctx: &Surroundings, blackboard: &mut Blackboard) -> Result<(), AgentError> {
    if !view.body.is_finite() {
        return Err(AgentError::NonFinite { what: "agent body" });
    }
    let position = view.body.position;
    let remembered = view.memory.suspected_position();
    let threat = view.perception.player_position.or(remembered);

    let cover = match (ctx.geometry, threat) {
        (Some(geometry), Some(threat)) => find_best_cover(
            geometry,
            &CoverQuery {
                origin: position,
                threat,
                goal: position,
                radius: ctx.config.cover.search_radius,
                body_radius: view.body.radius,
            },
            &ctx.config.cover,
        ),
        _ => None,
    };
    let sheltered = match (ctx.geometry, threat) {
        (Some(geometry), Some(threat)) => in_cover(geometry, position, threat),
        _ => false,
    };
    let flank_available = !view.reflexes.flank_locked()
        && remembered
            .and_then(|anchor| {
                choose_side(ctx.geometry, position, anchor, view.body.radius, &ctx.config.flank)
            })
            .is_some();

    let observations = Observations {
        player_visible: view.perception.player_visible,
        player_distracted: view.perception.player_distracted,
        player_reloading: view.perception.vulnerability.reloading,
        player_ammo_empty: view.perception.vulnerability.ammo_empty,
        clear_shot: threat.map_or(false, |target| clear_shot(view, target, ctx)),
        has_cover: cover.is_some(),
        in_cover: sheltered,
        under_fire: view.reflexes.under_fire(),
        can_shoot: view.weapon.can_shoot(),
        cautious: view.reflexes.cautious(),
        flank_available,
        has_grenade: view.grenades.ready(),
        memory_confidence: view.memory.confidence(),
        player_distance: view
            .perception
            .player_distance
            .or_else(|| remembered.map(|p| p.distance(position))),
        health_fraction: view.health.fraction(),
        ammo_fraction: view.weapon.ammo_fraction(),
        allies_nearby: ctx
            .roster
            .allies_near(view.id, position, ctx.config.combat.ally_radius),
    };

    blackboard.world_state = WorldState::from_observations(&observations);
    blackboard.cover = cover;
    Ok(())
}

/// Rebuilds every live agent's world state from this tick's perception
#[allow(clippy::type_complexity)]
pub fn update_world_states(
    config: Res<TacticsConfig>,
    geometry: Option<Res<LevelGeometry>>,
    roster: Res<Roster>,
    mut query: Query<
        (
            &AgentId,
            &Body,
            &Health,
            &WeaponStatus,
            &Grenades,
            &Perception,
            &PlayerMemory,
            &Reflexes,
            &mut Blackboard,
        ),
        Live,
    >,
) {
    let ctx = Surroundings {
        config: &config,
        geometry: geometry.as_deref(),
        roster: &roster,
    };

    for (id, body, health, weapon, grenades, perception, memory, reflexes, mut blackboard) in query.iter_mut() {
        let view = AgentView {
            id: *id,
            body,
            health,
            weapon,
            grenades,
            perception,
            memory,
            reflexes,
        };
        if let Err(err) = build_world_state(&view, &ctx, &mut blackboard) {
            report(*id, "world state", &err);
        }
    }
}

/// Timed reflexes: the delayed reload-complete downgrade and the flank
/// timeout. Both write their consequences straight into this tick's world
/// state so the planner sees them.
#[allow(clippy::type_complexity)]
pub fn run_reflexes(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    table: Res<TransitionTable>,
    mut telemetry: ResMut<TelemetryQueue>,
    mut query: Query<
        (
            &AgentId,
            &Perception,
            &mut TacticalState,
            &mut Reflexes,
            &mut Blackboard,
        ),
        Live,
    >,
) {
    for (id, perception, mut state, mut reflexes, mut blackboard) in query.iter_mut() {
        if reflexes.take_expired_reload_reflex() {
            let has_cover = blackboard.world_state.flag(Fact::HasCover);
            match reload_downgrade(state.kind(), has_cover) {
                Some(target) => {
                    let requested = AgentState::simple(target).unwrap_or(AgentState::SeekingCover);
                    match controller::transition(&table, &mut state, requested, TransitionCause::ReloadReflex, clock.time) {
                        Ok(changes) => {
                            record_changes(&mut telemetry, &clock, *id, &changes);
                            reflexes.cautious_timer = config.reflex.cautious_duration;
                            blackboard.world_state.set(Fact::Cautious, true);
                            telemetry.record(
                                &clock,
                                *id,
                                AgentEventKind::ReflexTriggered {
                                    reflex: Reflex::ReloadDowngrade,
                                },
                            );
                        }
                        Err(err) => report(*id, "reload reflex", &err),
                    }
                }
                None => {
                    tracing::debug!(agent = %id, state = %state.kind(), "reload reflex lapsed, no longer aggressive");
                }
            }
        }

        let flank_expired = state.kind() == StateKind::Flanking
            && !perception.player_visible
            && state.time_in_state(clock.time) >= config.flank.timeout as f64;
        if flank_expired {
            match controller::transition(
                &table,
                &mut state,
                AgentState::Pursuing,
                TransitionCause::FlankTimeout,
                clock.time,
            ) {
                Ok(changes) => {
                    record_changes(&mut telemetry, &clock, *id, &changes);
                    reflexes.flank_lockout_timer = config.flank.lockout;
                    blackboard.world_state.set(Fact::FlankAvailable, false);
                }
                Err(err) => report(*id, "flank timeout", &err),
            }
        }
    }
}

/// State the controller should enter to carry out `action`
fn requested_state(
    action: ActionKind,
    current: &TacticalState,
    position: Vec2,
    body_radius: f32,
    memory: &PlayerMemory,
    geometry: Option<&LevelGeometry>,
    config: &TacticsConfig,
) -> Result<AgentState, AgentError> {
    let kind = action.target_state();
    if kind != StateKind::Flanking {
        return AgentState::simple(kind).ok_or(AgentError::StateInvariant {
            from: current.kind(),
            to: kind,
        });
    }
    if current.kind() == StateKind::Flanking {
        return Ok(current.state);
    }
    let anchor = memory.require_position()?;
    Ok(match choose_side(geometry, position, anchor, body_radius, &config.flank) {
        Some(choice) => AgentState::Flanking {
            side: choice.side,
            target: choice.target,
            anchor,
        },
        None => AgentState::Pursuing,
    })
}

/// Timer side effects of entering `to` from `from`
fn on_enter(from: StateKind, to: StateKind, priority: bool, reflexes: &mut Reflexes, config: &TacticsConfig) {
    match to {
        StateKind::Assault if priority => reflexes.reaction_timer = 0.0,
        StateKind::Combat if matches!(from, StateKind::Idle | StateKind::Patrol) => {
            reflexes.reaction_timer = config.combat.detection_delay;
        }
        _ => {}
    }
}

/// Picks this tick's action and moves the state machine to carry it out.
/// An unreachable state is an invariant violation: it is logged and the
/// agent falls back to PATROL or IDLE.
#[allow(clippy::too_many_arguments)]
#[allow(clippy::type_complexity)]
pub fn plan_actions(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    library: Res<ActionLibrary>,
    table: Res<TransitionTable>,
    geometry: Option<Res<LevelGeometry>>,
    mut telemetry: ResMut<TelemetryQueue>,
    mut query: Query<
        (
            &AgentId,
            &Body,
            &PlayerMemory,
            &mut TacticalState,
            &mut Blackboard,
            &mut Reflexes,
        ),
        Live,
    >,
) {
    let geometry = geometry.as_deref();

    for (id, body, memory, mut state, mut blackboard, mut reflexes) in query.iter_mut() {
        let plan = select_action(&blackboard.world_state, &library, &config.costs)
            .unwrap_or_else(|| fallback_action(&blackboard.world_state, &library, &config.costs));

        if blackboard.last_action != Some(plan.action) {
            tracing::debug!(agent = %id, action = %plan.action, cost = plan.cost, priority = plan.priority, "plan switched");
            telemetry.record(
                &clock,
                *id,
                AgentEventKind::ActionSelected {
                    action: plan.action.name().to_string(),
                    cost: plan.cost,
                    priority: plan.priority,
                },
            );
        }
        blackboard.last_action = Some(plan.action);

        let requested = match requested_state(
            plan.action,
            &state,
            body.position,
            body.radius,
            memory,
            geometry,
            &config,
        ) {
            Ok(requested) => requested,
            Err(err) => {
                report(*id, "plan", &err);
                continue;
            }
        };

        let cause = if plan.priority {
            TransitionCause::PriorityOverride
        } else {
            TransitionCause::Plan
        };
        let from = state.kind();
        match controller::transition(&table, &mut state, requested, cause, clock.time) {
            Ok(changes) => {
                if !changes.is_empty() {
                    record_changes(&mut telemetry, &clock, *id, &changes);
                    on_enter(from, state.kind(), plan.priority, &mut reflexes, &config);
                }
            }
            Err(err) => {
                report(*id, "plan", &err);
                let fallback = fallback_action(&blackboard.world_state, &library, &config.costs);
                let fallback_kind = fallback.action.target_state();
                telemetry.record(
                    &clock,
                    *id,
                    AgentEventKind::InvariantViolation {
                        from,
                        requested: requested.kind(),
                        fallback: fallback_kind,
                    },
                );
                let fallback_state = AgentState::simple(fallback_kind).unwrap_or(AgentState::Idle);
                match controller::transition(&table, &mut state, fallback_state, TransitionCause::Fallback, clock.time) {
                    Ok(changes) => record_changes(&mut telemetry, &clock, *id, &changes),
                    Err(err) => report(*id, "fallback", &err),
                }
                blackboard.last_action = Some(fallback.action);
            }
        }
    }
}
