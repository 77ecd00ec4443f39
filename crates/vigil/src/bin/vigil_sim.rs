//! # VIGIL Simulation
//!
//! Drives scripted actors through a full engine on a simulated host clock
//! and prints what the engine decided about each of them.
//!
//! ```bash
//! # Built-in config
//! cargo run --bin vigil_sim
//!
//! # Custom config, more detail
//! RUST_LOG=debug cargo run --bin vigil_sim -- vigil.toml
//! ```

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;
use vigil::shared::{
    ActorId, ActorStatus, BlockPos, CombatHit, Event, EventPayload, InteractAction, Look, Material,
    Movement, MovementMode, Placement, Terrain, Timestamp, Vec3, EYE_HEIGHT, TICK_MS,
};
use vigil::{build_engine, AdminCommand, EngineAction, EngineConfig};

/// Simulated host time.
const DURATION_MS: u64 = 15_000;

/// Used when no config path is given: a lower threshold so a short run
/// reaches a sanction.
const SIM_CONFIG: &str = r"
[escalation]
threshold = 150
ban_duration_secs = 3600
";

/// Every script walks, looks and hits along +X.
const EAST: Look = Look::new(-90.0, 0.0);

/// What a scripted actor does every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Script {
    /// Walks with jitter and bridges at a human pace.
    Legit,
    /// Sprints at 0.45 blocks per tick.
    Speeder,
    /// Bridges a block every 50ms.
    Bridger,
    /// Swings on a 25ms metronome.
    Clicker,
    /// Hits from 4.5 blocks away.
    Reacher,
}

impl Script {
    const ALL: [Self; 5] = [
        Self::Legit,
        Self::Speeder,
        Self::Bridger,
        Self::Clicker,
        Self::Reacher,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::Legit => "legit",
            Self::Speeder => "speeder",
            Self::Bridger => "bridger",
            Self::Clicker => "clicker",
            Self::Reacher => "reacher",
        }
    }
}

struct Actor {
    id: ActorId,
    script: Script,
    position: Vec3,
}

impl Actor {
    fn spawn(script: Script, lane: f64) -> Self {
        Self {
            id: ActorId::random(),
            script,
            position: Vec3::new(0.5, 65.0, lane),
        }
    }

    fn walk(&mut self, at: Timestamp, step: f64, sprinting: bool) -> Event {
        let from = self.position;
        self.position = from + Vec3::new(step, 0.0, 0.0);
        let status = ActorStatus {
            movement: if sprinting {
                MovementMode::Sprinting
            } else {
                MovementMode::Walking
            },
            look: EAST,
            ..ActorStatus::default()
        };
        Event::new(
            self.id,
            at,
            EventPayload::PositionUpdate(Movement {
                from,
                to: self.position,
                on_ground: true,
                status,
                terrain: Terrain::default(),
                fall_distance: 0.0,
                velocity: Vec3::new(step, 0.0, 0.0),
            }),
        )
    }

    fn place(&self, at: Timestamp) -> Event {
        let feet = self.position;
        // Just ahead of the feet along +X, where the actor is looking.
        #[allow(clippy::cast_possible_truncation)]
        let block = BlockPos::new(
            (feet.x + 0.5).floor() as i32,
            feet.y as i32 - 1,
            feet.z.floor() as i32,
        );
        Event::new(
            self.id,
            at,
            EventPayload::BlockPlace(Placement {
                block,
                material: Material::new("cobblestone"),
                feet,
                eye: feet + Vec3::new(0.0, EYE_HEIGHT, 0.0),
                above_solid: false,
                status: ActorStatus {
                    look: Look::new(-90.0, 80.0),
                    ..ActorStatus::default()
                },
            }),
        )
    }

    fn hit(&self, at: Timestamp, distance: f64) -> Event {
        Event::new(
            self.id,
            at,
            EventPayload::CombatHit(CombatHit {
                victim: ActorId::random(),
                victim_position: self.position + Vec3::new(distance, 0.0, 0.0),
                damage: 1.0,
                is_critical: false,
                attacker_eye: self.position + Vec3::new(0.0, EYE_HEIGHT, 0.0),
                attacker_on_ground: true,
                attacker_fall_distance: 0.0,
                attacker_terrain: Terrain::default(),
                status: ActorStatus {
                    look: EAST,
                    ..ActorStatus::default()
                },
            }),
        )
    }

    fn swing(&self, at: Timestamp) -> Event {
        Event::new(
            self.id,
            at,
            EventPayload::Interact {
                action: InteractAction::Swing,
                status: ActorStatus::default(),
            },
        )
    }

    /// Events this actor emits between `at` and the next tick.
    fn act(&mut self, tick: u64, at: Timestamp, rng: &mut StdRng) -> Vec<Event> {
        match self.script {
            Script::Legit => {
                let mut events = vec![self.walk(at, rng.gen_range(0.15..0.22), false)];
                if tick % 8 == 0 {
                    events.push(self.place(at));
                }
                if tick % 3 == 0 {
                    let jitter = Duration::from_millis(rng.gen_range(0..40));
                    events.push(self.swing(at.after(jitter)));
                }
                events
            }
            Script::Speeder => vec![self.walk(at, 0.45, true)],
            Script::Bridger => vec![self.walk(at, 0.2, false), self.place(at)],
            Script::Clicker => vec![
                self.swing(at),
                self.swing(at.after(Duration::from_millis(TICK_MS / 2))),
            ],
            Script::Reacher => {
                let mut events = vec![self.walk(at, 0.1, false)];
                if tick % 10 == 0 {
                    events.push(self.hit(at, 4.5));
                }
                events
            }
        }
    }
}

#[derive(Default)]
struct Tally {
    alerts: BTreeMap<&'static str, u32>,
    rejects: u32,
    punished: Option<(u32, &'static str)>,
}

fn load_config() -> Result<EngineConfig, String> {
    match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).map_err(|e| format!("{path}: {e}")),
        None => EngineConfig::from_toml_str(SIM_CONFIG).map_err(|e| e.to_string()),
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let (engine, actions) = match build_engine(config) {
        Ok(built) => built,
        Err(e) => {
            eprintln!("engine error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut actors: Vec<Actor> = Script::ALL
        .iter()
        .enumerate()
        .map(|(lane, script)| Actor::spawn(*script, lane as f64 * 8.0 + 0.5))
        .collect();
    for actor in &actors {
        engine.handle(&Event::new(
            actor.id,
            Timestamp::ZERO,
            EventPayload::Join {
                position: actor.position,
            },
        ));
    }

    let mut tallies: BTreeMap<ActorId, Tally> = BTreeMap::new();
    let mut record = |action: EngineAction| {
        let tally = tallies.entry(action.actor()).or_default();
        match action {
            EngineAction::Alert { check, .. } => *tally.alerts.entry(check).or_default() += 1,
            EngineAction::Reject { .. } => tally.rejects += 1,
            EngineAction::Punish(p) => {
                tally.punished.get_or_insert((p.score, p.trigger));
            }
        }
    };

    let ticks = DURATION_MS / TICK_MS;
    for tick in 1..=ticks {
        let at = Timestamp::from_millis(tick * TICK_MS);
        for actor in &mut actors {
            for event in actor.act(tick, at, &mut rng) {
                engine.handle(&event);
            }
        }
        engine.tick(at);
        actions.drain().into_iter().for_each(&mut record);
    }

    println!();
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  VIGIL SIMULATION: {} actors, {}s of host time", actors.len(), DURATION_MS / 1_000);
    println!("═══════════════════════════════════════════════════════════════════");
    for actor in &actors {
        let tally = tallies.remove(&actor.id).unwrap_or_default();
        let alerts: Vec<String> = tally
            .alerts
            .iter()
            .map(|(check, n)| format!("{check}×{n}"))
            .collect();
        let verdict = match tally.punished {
            Some((score, trigger)) => format!("PUNISHED at {score} ({trigger})"),
            None if alerts.is_empty() => "clean".to_owned(),
            None => "flagged".to_owned(),
        };
        println!(
            "  {:<8} {:<18} rejects {:>4}  {}",
            actor.script.name(),
            verdict,
            tally.rejects,
            if alerts.is_empty() {
                "-".to_owned()
            } else {
                alerts.join(" ")
            }
        );
    }
    println!();
    println!("{}", AdminCommand::Status.execute(&engine));

    for actor in &actors {
        engine.handle(&Event::new(
            actor.id,
            Timestamp::from_millis(DURATION_MS + TICK_MS),
            EventPayload::Quit,
        ));
    }
    ExitCode::SUCCESS
}
