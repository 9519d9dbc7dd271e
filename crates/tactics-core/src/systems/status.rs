//! Status Systems
//!
//! Damage intake, death, timer upkeep and the per-tick roster.

use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

use crate::components::agent::{Agent, AgentId, Body, Dead, Frozen, Grenades, Health};
use crate::config::TacticsConfig;
use crate::controller::{self, AgentState, DamageQueue, DamageReport, Reflexes, TacticalState, TransitionTable};
use crate::error::AgentError;
use crate::intents::TelemetryQueue;
use crate::movement::Navigation;
use crate::perception::{IntelLedger, Perception};
use crate::systems::decision::record_changes;
use crate::systems::{report, Live, Roster, RosterEntry};
use crate::SimClock;
use tactics_events::{AgentEventKind, TransitionCause};

/// Applies queued damage. A lethal hit moves the agent to DEAD, cancels
/// every timer and produces exactly one `Died` event and death notice.
/// Reports for frozen agents wait until the freeze ends.
#[allow(clippy::too_many_arguments)]
#[allow(clippy::type_complexity)]
pub fn apply_damage(
    mut commands: Commands,
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    table: Res<TransitionTable>,
    mut damage: ResMut<DamageQueue>,
    mut ledger: ResMut<IntelLedger>,
    mut telemetry: ResMut<TelemetryQueue>,
    mut query: Query<
        (
            Entity,
            &AgentId,
            &mut Health,
            &mut Reflexes,
            &mut TacticalState,
            &mut Navigation,
            Has<Frozen>,
        ),
        (With<Agent>, Without<Dead>),
    >,
) {
    if damage.is_empty() {
        return;
    }
    let mut by_agent: BTreeMap<AgentId, Vec<DamageReport>> = BTreeMap::new();
    for (agent, report) in damage.drain() {
        by_agent.entry(agent).or_default().push(report);
    }

    for (entity, id, mut health, mut reflexes, mut state, mut navigation, frozen) in query.iter_mut() {
        let Some(reports) = by_agent.remove(id) else {
            continue;
        };
        if frozen {
            for pending in reports {
                damage.push(*id, pending);
            }
            continue;
        }

        for hit in reports {
            if !hit.amount.is_finite() || !hit.attacker_direction.is_finite() {
                report(*id, "damage", &AgentError::NonFinite { what: "damage report" });
                continue;
            }

            let lethal = health.apply_damage(hit.amount);
            if !lethal {
                reflexes.register_hit(&hit, &config.reflex);
                telemetry.record(
                    &clock,
                    *id,
                    AgentEventKind::HitReaction {
                        direction: reflexes.hit_reaction_direction.to_array(),
                        amount: hit.amount,
                    },
                );
                continue;
            }

            match controller::transition(&table, &mut state, AgentState::Dead, TransitionCause::Death, clock.time) {
                Ok(changes) => record_changes(&mut telemetry, &clock, *id, &changes),
                Err(err) => {
                    // Death is never refused
                    report(*id, "damage", &err);
                    *state = TacticalState::new(AgentState::Dead, clock.time);
                }
            }
            reflexes.clear();
            navigation.clear();
            navigation.settle_timer = 0.0;
            ledger.forget(*id);
            commands.entity(entity).insert(Dead);
            telemetry.record(&clock, *id, AgentEventKind::Died);
            telemetry.record_death(*id);
            tracing::info!(agent = %id, tick = clock.tick, "agent died");
            break;
        }
    }

    for agent in by_agent.keys() {
        tracing::debug!(%agent, "damage for unknown or dead agent dropped");
    }
}

/// Counts down reflex, vulnerability and grenade timers
pub fn advance_timers(
    clock: Res<SimClock>,
    mut query: Query<(&mut Reflexes, &mut Perception, &mut Grenades), Live>,
) {
    for (mut reflexes, mut perception, mut grenades) in query.iter_mut() {
        reflexes.tick(clock.dt);
        perception.vulnerability.tick(clock.dt);
        grenades.cooldown_remaining = (grenades.cooldown_remaining - clock.dt).max(0.0);
    }
}

/// Snapshots the position of every agent still alive, frozen ones
/// included, into the [`Roster`]
pub fn build_roster(
    mut roster: ResMut<Roster>,
    query: Query<(&AgentId, &Body, Has<Frozen>), (With<Agent>, Without<Dead>)>,
) {
    let entries = query
        .iter()
        .filter(|(_, body, _)| body.position.is_finite())
        .map(|(id, body, frozen)| RosterEntry {
            id: *id,
            position: body.position,
            frozen,
        })
        .collect();
    roster.rebuild(entries);
}
