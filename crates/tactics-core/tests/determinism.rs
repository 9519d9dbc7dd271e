//! Determinism verification tests
//!
//! The engine has no randomness of its own: identical inputs must give
//! identical intents and telemetry, tick for tick.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use tactics_core::controller::DamageReport;
use tactics_core::geometry::{LevelGeometry, Obstacle};
use tactics_core::perception::{SoundCategory, SoundEvent};
use tactics_core::{AgentSpawn, Intent, PlayerSnapshot, Simulation, TickOutput, Vec2};
use tactics_events::log::read_events;
use tactics_events::EventLog;

/// A walled room with two crates, three agents and a player driven by `seed`.
/// Move intents are applied as straight-line motion, blocked by walls.
fn run_scenario(seed: u64, ticks: usize) -> Vec<TickOutput> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut sim = Simulation::with_defaults();
    let mut level = LevelGeometry::arena(Vec2::new(500.0, 350.0), 20.0);
    level.add(Obstacle::wall(Vec2::new(-150.0, -60.0), Vec2::new(-90.0, 60.0)));
    level.add(Obstacle::wall(Vec2::new(120.0, 80.0), Vec2::new(220.0, 130.0)));
    sim.set_geometry(Some(level.clone()));

    let agents = [
        sim.spawn_agent(AgentSpawn::at(Vec2::new(-400.0, 250.0)).with_grenades(1)),
        sim.spawn_agent(
            AgentSpawn::at(Vec2::new(400.0, -250.0))
                .with_patrol(vec![Vec2::new(400.0, 250.0), Vec2::new(400.0, -250.0)], 1.0),
        ),
        sim.spawn_agent(AgentSpawn::at(Vec2::new(0.0, -300.0)).facing(Vec2::Y)),
    ];

    let dt = sim.clock().dt;
    let mut player = Vec2::ZERO;
    let mut heading = Vec2::X;
    let mut outputs = Vec::with_capacity(ticks);

    for _ in 0..ticks {
        if rng.gen_bool(0.02) {
            heading = Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU));
        }
        let next = player + heading * 110.0 * dt;
        if level.point_free(next, 14.0) {
            player = next;
        } else {
            heading = -heading;
        }
        let aim = player + Vec2::from_angle(rng.gen_range(-0.5f32..0.5)).rotate(heading) * 100.0;
        sim.set_player(Some(PlayerSnapshot::new(player, aim)));

        if rng.gen_bool(0.04) {
            sim.emit_sound(SoundEvent::player(player, SoundCategory::Gunshot, 1.0, 700.0));
            let victim = agents[rng.gen_range(0..agents.len())];
            if rng.gen_bool(0.2) {
                sim.report_damage(
                    victim,
                    DamageReport {
                        amount: 9.0,
                        attacker_direction: Vec2::X,
                    },
                )
                .unwrap();
            }
        }

        let output = sim.tick();
        for intent in &output.intents {
            if let Intent::Move { agent, direction, speed } = *intent {
                let body = sim.body(agent).unwrap();
                let next = body.position + direction * speed * dt;
                if level.point_free(next, body.radius) {
                    sim.set_agent_motion(agent, next, direction * speed).unwrap();
                } else {
                    sim.set_agent_motion(agent, body.position, Vec2::ZERO).unwrap();
                }
            }
        }
        outputs.push(output);
    }
    outputs
}

#[test]
fn test_same_inputs_same_outputs() {
    let first = run_scenario(42, 600);
    let second = run_scenario(42, 600);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a, b, "diverged at tick {}", a.tick);
    }
}

#[test]
fn test_scenario_is_eventful() {
    let outputs = run_scenario(3, 600);
    let events: usize = outputs.iter().map(|o| o.events.len()).sum();
    let moving = outputs
        .iter()
        .flat_map(|o| o.intents.iter())
        .any(|intent| matches!(intent, Intent::Move { speed, .. } if *speed > 0.0));
    assert!(events > 0);
    assert!(moving);
}

#[test]
fn test_telemetry_survives_jsonl_round_trip() {
    let outputs = run_scenario(8, 300);
    let events: Vec<_> = outputs.iter().flat_map(|o| o.events.clone()).collect();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    {
        let mut log = EventLog::create(&path).unwrap();
        log.log_batch(&events).unwrap();
        log.flush().unwrap();
        assert_eq!(log.event_count(), events.len() as u64);
    }

    let replayed = read_events(&path).unwrap();
    assert_eq!(replayed, events);
}
