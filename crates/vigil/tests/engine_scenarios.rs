//! End-to-end scenarios: full catalog, real config, host-driven clock.

use std::sync::Arc;
use std::thread;

use vigil::shared::testing::{damage, join, ms, quit, swing, teleport, HitBuilder, MoveBuilder, PlaceBuilder};
use vigil::shared::{ActorId, DamageCause, Event, GameMode, MovementMode, Surface, Vec3};
use vigil::{build_engine, AdminCommand, Engine, EngineAction, EngineConfig, VigilError};

const START: Vec3 = Vec3::new(0.0, 64.0, 0.0);

fn engine() -> (Engine, vigil::ActionReceiver) {
    build_engine(EngineConfig::default()).unwrap()
}

fn engine_with(toml: &str) -> (Engine, vigil::ActionReceiver) {
    build_engine(EngineConfig::from_toml_str(toml).unwrap()).unwrap()
}

/// Sprint tick `n`: 0.45 blocks along +X, contiguous with tick `n - 1`.
fn sprint(actor: ActorId, n: u64) -> Event {
    let from = START + Vec3::new(n as f64 * 0.45, 0.0, 0.0);
    MoveBuilder::new(actor, ms(n * 50)).step_x(from, 0.45).sprinting().build()
}

fn far_hit(actor: ActorId, at: u64) -> Event {
    HitBuilder::new(actor, ActorId::random(), ms(at))
        .victim_at(Vec3::new(4.5, 64.0, 0.0))
        .build()
}

#[test]
fn test_sprint_hack_flags_on_twentieth_tick_and_rejects() {
    let (engine, actions) = engine();
    let actor = ActorId::random();

    for n in 0..19 {
        assert!(engine.handle(&sprint(actor, n)).is_clean(), "tick {n}");
    }
    let outcome = engine.handle(&sprint(actor, 19));
    assert_eq!(outcome.verdicts.len(), 1);
    assert_eq!(outcome.verdicts[0].check, "speed");
    assert!(outcome.rejected());

    let sent = actions.drain();
    assert!(matches!(
        sent.as_slice(),
        [
            EngineAction::Alert { check: "speed", total: 1, .. },
            EngineAction::Reject { check: "speed", .. },
        ]
    ));
}

#[test]
fn test_walking_is_clean() {
    let (engine, actions) = engine();
    let actor = ActorId::random();
    for n in 0..100 {
        let from = START + Vec3::new(n as f64 * 0.2, 0.0, 0.0);
        let event = MoveBuilder::new(actor, ms(n * 50)).step_x(from, 0.2).build();
        assert!(engine.handle(&event).is_clean());
    }
    assert!(actions.is_empty());
    assert!(engine.violations(actor).is_none());
}

#[test]
fn test_teleport_grace_then_fresh_window() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();

    // Half a window of speeding, then a teleport.
    for n in 0..10 {
        engine.handle(&sprint(actor, n));
    }
    engine.handle(&teleport(actor, ms(500), START + Vec3::new(10.0 * 0.45, 0.0, 0.0)));

    // Grace runs to 2000ms: ticks 10..=39 are suppressed however fast.
    for n in 10..40 {
        assert!(engine.handle(&sprint(actor, n)).is_clean(), "tick {n}");
    }
    // After grace the window starts empty: 19 fast ticks pass, the 20th flags.
    for n in 40..59 {
        assert!(engine.handle(&sprint(actor, n)).is_clean(), "tick {n}");
    }
    assert_eq!(engine.handle(&sprint(actor, 59)).verdicts.len(), 1);
}

#[test]
fn test_repeated_teleports_are_idempotent() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    let to = START;
    engine.handle(&teleport(actor, ms(0), to));
    engine.handle(&teleport(actor, ms(0), to));
    // Same result as a single teleport: grace to 1500ms, then a fresh window.
    for n in 1..49 {
        assert!(engine.handle(&sprint(actor, n)).is_clean(), "tick {n}");
    }
    assert_eq!(engine.handle(&sprint(actor, 49)).verdicts.len(), 1);
}

#[test]
fn test_join_grace() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    engine.handle(&join(actor, ms(0)));
    assert!(engine.is_tracked(actor));
    // 1000ms of join grace: reach is suppressed too.
    assert!(engine.handle(&far_hit(actor, 900)).is_clean());
    assert_eq!(engine.handle(&far_hit(actor, 1_000)).verdicts.len(), 1);
}

#[test]
fn test_join_grace_covers_bridging() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    engine.handle(&join(actor, ms(0)));
    assert!(engine.handle(&PlaceBuilder::new(actor, ms(500)).build()).is_clean());
    assert!(engine.handle(&PlaceBuilder::new(actor, ms(550)).build()).is_clean());

    // Placements inside grace set no baseline.
    assert!(engine.handle(&PlaceBuilder::new(actor, ms(1_100)).build()).is_clean());
    let outcome = engine.handle(&PlaceBuilder::new(actor, ms(1_150)).build());
    assert!(outcome.verdicts.iter().any(|v| v.check == "scaffold"));
}

#[test]
fn test_escalation_exactly_once() {
    let (engine, actions) = engine_with("[escalation]\nthreshold = 3\n");
    let actor = ActorId::random();

    let punishments: Vec<_> = (0..5)
        .flat_map(|i| engine.handle(&far_hit(actor, i * 600)).punishments)
        .collect();

    assert_eq!(punishments.len(), 1);
    assert_eq!(punishments[0].score, 3);
    assert_eq!(punishments[0].trigger, "reach");
    assert_eq!(punishments[0].record.for_check("reach"), 3);
    // Score restarted at zero after the crossing.
    assert_eq!(engine.violations(actor).unwrap().total(), 2);

    let punish_actions = actions
        .drain()
        .into_iter()
        .filter(|a| matches!(a, EngineAction::Punish(_)))
        .count();
    assert_eq!(punish_actions, 1);
    assert_eq!(engine.stats().punishments, 1);
}

#[test]
fn test_ledger_is_additive_across_detectors() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    let mut severities = 0;

    for i in 0..3 {
        severities += engine
            .handle(&far_hit(actor, i * 600))
            .verdicts
            .iter()
            .map(|v| v.severity)
            .sum::<u32>();
    }
    // Clicks every 30ms trip regularity, then rate as well.
    for i in 0..26 {
        severities += engine
            .handle(&swing(actor, ms(5_000 + i * 30)))
            .verdicts
            .iter()
            .map(|v| v.severity)
            .sum::<u32>();
    }

    let record = engine.violations(actor).unwrap();
    assert_eq!(record.for_check("reach"), 3);
    assert!(record.for_check("auto_clicker") > 0);
    assert_eq!(record.total(), severities);
    assert_eq!(record.categories().map(|(_, s)| s).sum::<u32>(), record.total());
}

#[test]
fn test_exempt_actors_are_never_flagged() {
    let (engine, actions) = engine();

    let builder = ActorId::random();
    for i in 0..20 {
        let place = PlaceBuilder::new(builder, ms(i * 10))
            .game_mode(GameMode::Creative)
            .build();
        assert!(engine.handle(&place).is_clean());
    }

    let glider = ActorId::random();
    for n in 0..40 {
        let from = START + Vec3::new(n as f64 * 1.5, 0.0, 0.0);
        let event = MoveBuilder::new(glider, ms(n * 50))
            .step_x(from, 1.5)
            .on_ground(false)
            .mode(MovementMode::Gliding)
            .velocity(Vec3::new(1.5, -1.0, 0.0))
            .build();
        assert!(engine.handle(&event).is_clean());
    }
    assert!(actions.is_empty());
}

#[test]
fn test_missing_fall_damage_flags_on_tick() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    let falling = MoveBuilder::new(actor, ms(1_000))
        .between(Vec3::new(0.0, 66.0, 0.0), Vec3::new(0.0, 65.0, 0.0))
        .on_ground(false)
        .fall_distance(4.0)
        .build();
    let landing = MoveBuilder::new(actor, ms(1_050))
        .between(Vec3::new(0.0, 65.0, 0.0), Vec3::new(0.0, 64.0, 0.0))
        .fall_distance(5.0)
        .below(Surface::Solid)
        .build();
    engine.handle(&falling);
    engine.handle(&landing);
    assert_eq!(engine.stats().pending_tasks, 1);

    assert!(engine.tick(ms(1_100)).is_clean());
    let outcome = engine.tick(ms(1_150));
    assert_eq!(outcome.verdicts.len(), 1);
    assert_eq!(outcome.verdicts[0].check, "no_fall");
}

#[test]
fn test_fall_damage_leaves_stale_task() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    engine.handle(
        &MoveBuilder::new(actor, ms(1_000))
            .between(Vec3::new(0.0, 66.0, 0.0), Vec3::new(0.0, 65.0, 0.0))
            .on_ground(false)
            .fall_distance(4.0)
            .build(),
    );
    engine.handle(
        &MoveBuilder::new(actor, ms(1_050))
            .between(Vec3::new(0.0, 65.0, 0.0), Vec3::new(0.0, 64.0, 0.0))
            .fall_distance(5.0)
            .build(),
    );
    engine.handle(&damage(actor, ms(1_060), DamageCause::Fall, 2.0));

    assert!(engine.tick(ms(1_200)).is_clean());
    assert_eq!(engine.stats().stale_tasks, 1);
}

#[test]
fn test_quit_purges_everything() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    engine.handle(&far_hit(actor, 0));
    engine.handle(
        &MoveBuilder::new(actor, ms(1_000))
            .between(Vec3::new(0.0, 66.0, 0.0), Vec3::new(0.0, 65.0, 0.0))
            .on_ground(false)
            .fall_distance(4.0)
            .build(),
    );
    engine.handle(
        &MoveBuilder::new(actor, ms(1_050))
            .between(Vec3::new(0.0, 65.0, 0.0), Vec3::new(0.0, 64.0, 0.0))
            .fall_distance(5.0)
            .build(),
    );
    assert!(engine.violations(actor).is_some());

    engine.handle(&quit(actor, ms(1_060)));
    assert!(!engine.is_tracked(actor));
    assert!(engine.violations(actor).is_none());
    assert_eq!(engine.stats().pending_tasks, 0);
    assert!(engine.tick(ms(2_000)).is_clean());
    assert_eq!(engine.stats().tracked_actors, 0);
}

#[test]
fn test_idle_actor_is_forgotten() {
    let (engine, _actions) = engine();
    let idle = ActorId::random();
    let active = ActorId::random();
    engine.handle(&far_hit(idle, 0));
    engine.handle(&far_hit(active, 0));
    assert!(engine.tick(ms(1_000)).is_clean());
    assert_eq!(engine.stats().tracked_actors, 2);

    engine.handle(&far_hit(active, 250_000));
    assert!(engine.tick(ms(302_000)).is_clean());
    assert!(!engine.is_tracked(idle));
    assert!(engine.violations(idle).is_none());
    assert!(engine.is_tracked(active));
    assert_eq!(engine.violations(active).unwrap().total(), 2);

    assert!(engine.tick(ms(552_000)).is_clean());
    assert!(engine.violations(active).is_none());
    assert_eq!(engine.stats().tracked_actors, 0);
    assert_eq!(engine.stats().pending_tasks, 0);
}

#[test]
fn test_malformed_event_yields_nothing() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    let event = MoveBuilder::new(actor, ms(0))
        .between(START, Vec3::new(f64::NAN, 64.0, 0.0))
        .build();
    assert!(engine.handle(&event).is_clean());
    let stats = engine.stats();
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.events, 1);
    assert!(!engine.is_tracked(actor));
}

#[test]
fn test_disabled_detector_is_not_registered() {
    let (engine, _actions) = engine_with("[checks]\ndisabled = [\"reach\"]\n");
    assert!(!engine.detector_ids().contains(&"reach"));
    assert!(engine.handle(&far_hit(ActorId::random(), 0)).is_clean());
}

#[test]
fn test_bad_config_refuses_to_start() {
    let unknown = EngineConfig::from_toml_str("[checks]\ndisabled = [\"jesus\"]\n").unwrap();
    assert!(matches!(build_engine(unknown), Err(VigilError::UnknownCheck(_))));

    let zero = EngineConfig::from_toml_str("[escalation]\nthreshold = 0\n").unwrap();
    assert!(matches!(build_engine(zero), Err(VigilError::Config(_))));

    let stray = EngineConfig::from_toml_str("[checks.jesus]\nlimit = 2\n").unwrap();
    assert!(matches!(build_engine(stray), Err(VigilError::Config(_))));
}

#[test]
fn test_admin_commands() {
    let (engine, _actions) = engine();
    let actor = ActorId::random();
    engine.handle(&far_hit(actor, 0));
    engine.handle(&far_hit(actor, 600));

    let status: AdminCommand = "status".parse().unwrap();
    let reply = status.execute(&engine);
    assert!(reply.contains("detectors: speed, scaffold"));
    assert!(reply.contains(&format!("{actor} 2")));

    let show: AdminCommand = format!("violations {actor}").parse().unwrap();
    let reply = show.execute(&engine);
    assert!(reply.contains("2 / 500"));
    assert!(reply.contains("reach 2"));

    let version: AdminCommand = "version".parse().unwrap();
    let reply = version.execute(&engine);
    assert!(reply.starts_with(&format!("vigil {}", env!("CARGO_PKG_VERSION"))));
    assert!(reply.ends_with("22 detectors"));

    let reset: AdminCommand = format!("reset {actor}").parse().unwrap();
    assert!(reset.execute(&engine).contains("reset"));
    assert!(show.execute(&engine).contains("no violations"));
}

#[test]
fn test_actors_are_processed_concurrently() {
    let (engine, _actions) = engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let actor = ActorId::random();
                let flagged: u32 = (0..40)
                    .map(|n| engine.handle(&sprint(actor, n)).verdicts.len() as u32)
                    .sum();
                (actor, flagged)
            })
        })
        .collect();

    for handle in handles {
        let (actor, flagged) = handle.join().unwrap();
        assert!(flagged > 0);
        assert_eq!(engine.violations(actor).unwrap().total(), flagged);
    }
    assert_eq!(engine.stats().tracked_actors, 4);
}
