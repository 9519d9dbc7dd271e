//! Perception Systems
//!
//! Memory decay, vision, hearing and intel sharing, run in that order so a
//! fresh sighting or sound is never decayed in the tick it arrives.

use bevy_ecs::prelude::*;

use crate::components::agent::{AgentId, Body};
use crate::components::player::PlayerSnapshot;
use crate::config::TacticsConfig;
use crate::controller::{Reflexes, TacticalState};
use crate::error::AgentError;
use crate::geometry::LevelGeometry;
use crate::intents::TelemetryQueue;
use crate::perception::hearing::{listen, SoundCategory, SoundQueue, SoundSource};
use crate::perception::intel::plan_intel_transfers;
use crate::perception::vision::observe_player;
use crate::perception::{IntelLedger, IntelPeer, MemorySource, Perception, PlayerMemory};
use crate::systems::{report, Live};
use crate::SimClock;
use tactics_events::{AgentEventKind, Reflex};

/// `confidence -= decay_rate * dt` for every live agent
pub fn decay_memories(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    mut query: Query<&mut PlayerMemory, Live>,
) {
    for mut memory in query.iter_mut() {
        memory.decay(config.memory.decay_rate, clock.dt);
    }
}

/// Looks for the player. A sighting refreshes memory at full visual
/// confidence. No player or no geometry means nothing is seen.
pub fn update_vision(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    player: Option<Res<PlayerSnapshot>>,
    geometry: Option<Res<LevelGeometry>>,
    mut query: Query<(&AgentId, &Body, &mut Perception, &mut PlayerMemory), Live>,
) {
    let player = player.as_deref();
    let geometry = geometry.as_deref();

    for (id, body, mut perception, mut memory) in query.iter_mut() {
        if !body.is_finite() {
            report(*id, "vision", &AgentError::NonFinite { what: "agent body" });
            perception.blind();
            continue;
        }
        match observe_player(body.position, body.facing, player, geometry, &config.vision) {
            Ok(sight) => {
                perception.apply_vision(&sight);
                if sight.visible {
                    memory.observe(
                        sight.player_position,
                        config.memory.visual_confidence,
                        clock.time,
                        MemorySource::Vision,
                    );
                }
            }
            Err(err) => {
                report(*id, "vision", &err);
                perception.blind();
            }
        }
    }
}

/// Every live agent reads this tick's sound queue. Only player sounds feed
/// memory; category effects follow the sound table.
#[allow(clippy::type_complexity)]
pub fn process_hearing(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    sounds: Res<SoundQueue>,
    geometry: Option<Res<LevelGeometry>>,
    mut telemetry: ResMut<TelemetryQueue>,
    mut query: Query<
        (
            &AgentId,
            &Body,
            &TacticalState,
            &mut Perception,
            &mut PlayerMemory,
            &mut Reflexes,
        ),
        Live,
    >,
) {
    let geometry = geometry.as_deref();

    for (id, body, state, mut perception, mut memory, mut reflexes) in query.iter_mut() {
        perception.shot_at = false;
        if sounds.is_empty() {
            continue;
        }
        if !body.position.is_finite() {
            report(*id, "hearing", &AgentError::NonFinite { what: "agent position" });
            continue;
        }

        for heard in listen(sounds.events(), body.position, geometry, &config.hearing) {
            if heard.source != SoundSource::Player {
                continue;
            }
            memory.observe(
                heard.origin,
                heard.category.confidence(&config.memory),
                clock.time,
                MemorySource::Hearing(heard.category),
            );

            match heard.category {
                SoundCategory::Gunshot => {
                    if heard.received >= config.hearing.under_fire_intensity {
                        reflexes.mark_under_fire(config.reflex.under_fire_duration);
                        perception.shot_at = true;
                    }
                }
                SoundCategory::Reload => perception
                    .vulnerability
                    .mark_reloading(config.reflex.vulnerability_duration),
                SoundCategory::EmptyClick => perception
                    .vulnerability
                    .mark_ammo_empty(config.reflex.vulnerability_duration),
                SoundCategory::ReloadComplete => {
                    perception.vulnerability.clear();
                    if state.kind().is_aggressive() && reflexes.reload_reflex_timer.is_none() {
                        reflexes.arm_reload_reflex(config.reflex.reload_complete_delay);
                        telemetry.record(
                            &clock,
                            *id,
                            AgentEventKind::ReflexTriggered {
                                reflex: Reflex::ReloadCompleteHeard,
                            },
                        );
                    }
                }
                SoundCategory::Footstep => {}
            }
        }
    }
}

/// Copies better intel between nearby agents. Transfers are planned from a
/// snapshot of every memory, then applied.
pub fn share_intel(
    clock: Res<SimClock>,
    config: Res<TacticsConfig>,
    mut ledger: ResMut<IntelLedger>,
    mut telemetry: ResMut<TelemetryQueue>,
    mut query: Query<(&AgentId, &Body, &mut PlayerMemory), Live>,
) {
    let mut peers: Vec<IntelPeer> = query
        .iter()
        .filter(|(_, body, _)| body.position.is_finite())
        .map(|(id, body, memory)| IntelPeer {
            id: *id,
            position: body.position,
            memory: memory
                .suspected_position()
                .map(|position| (position, memory.confidence())),
        })
        .collect();
    if peers.len() < 2 {
        return;
    }
    peers.sort_by_key(|peer| peer.id);

    let transfers = plan_intel_transfers(&peers, &ledger, clock.time, &config.intel);
    if transfers.is_empty() {
        return;
    }

    for (id, _, mut memory) in query.iter_mut() {
        let Some(transfer) = transfers.iter().find(|t| t.receiver == *id) else {
            continue;
        };
        let accepted = memory.accept_intel(
            transfer.position,
            transfer.source_confidence,
            config.intel.factor,
            transfer.source,
            clock.time,
        );
        if let Some(confidence) = accepted {
            ledger.record(transfer.receiver, transfer.source, clock.time);
            telemetry.record(
                &clock,
                *id,
                AgentEventKind::IntelReceived {
                    from: transfer.source.0,
                    confidence,
                },
            );
            tracing::debug!(agent = %id, from = %transfer.source, confidence, "intel received");
        }
    }
}
