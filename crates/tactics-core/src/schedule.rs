//! Tick Schedule
//!
//! One single-threaded schedule run per fixed tick. The order is the data
//! flow: status upkeep, perception, world state, reflexes, planning,
//! execution, facing and frame end.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

use crate::actions::ActionLibrary;
use crate::config::TacticsConfig;
use crate::controller::{DamageQueue, TransitionTable};
use crate::geometry::LevelGeometry;
use crate::intents::{IntentQueue, TelemetryQueue};
use crate::perception::{IntelLedger, SoundQueue};
use crate::systems::*;
use crate::SimClock;

/// Builds the per-tick schedule
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            apply_damage,
            advance_timers,
            build_roster,
            decay_memories,
            update_vision,
            process_hearing,
            share_intel,
            update_world_states,
            run_reflexes,
            plan_actions,
            execute_states,
            resolve_facing,
            finish_tick,
        )
            .chain(),
    );
    schedule
}

/// Inserts every resource the systems expect. Level geometry starts out
/// as open ground; the player snapshot starts absent.
pub fn init_resources(world: &mut World, config: TacticsConfig) {
    world.insert_resource(SimClock::new(config.simulation.tick_rate));
    world.insert_resource(ActionLibrary::standard(&config));
    world.insert_resource(TransitionTable::standard());
    world.insert_resource(LevelGeometry::new());
    world.insert_resource(SoundQueue::default());
    world.insert_resource(DamageQueue::default());
    world.insert_resource(IntelLedger::default());
    world.insert_resource(IntentQueue::default());
    world.insert_resource(TelemetryQueue::default());
    world.insert_resource(Roster::default());
    world.insert_resource(config);
}
