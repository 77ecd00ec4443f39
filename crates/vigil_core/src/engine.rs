//! # Detection Engine
//!
//! Routes host events to interested detectors, records verdicts, escalates
//! and publishes outbound actions.
//!
//! ## Data Flow
//!
//! ```text
//! Event ──> Engine::handle ──> Detector (gating + rule) ──> Verdict
//!                                                             │
//!        ActionBus <── Alert/Reject <── ViolationLedger <─────┘
//!            ▲                               │
//!            └──── Punish <── EscalationPolicy ──> PunishmentExecutor
//! ```
//!
//! ## Threading
//!
//! Every method takes `&self`. The host may call [`Engine::handle`] from
//! several threads as long as each actor's events arrive in order; different
//! actors proceed in parallel. Detector faults are contained: a panicking
//! detector yields no verdict for that event and the others still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use vigil_shared::{ActorId, Event, EventPayload, Timestamp, Vec3};

use crate::actions::{ActionBus, ActionReceiver, ActionSender, EngineAction};
use crate::check::{CheckId, Detector, Fired, Verdict};
use crate::config::EngineConfig;
use crate::error::{VigilError, VigilResult};
use crate::escalation::{ChannelExecutor, EscalationPolicy, Punishment, PunishmentExecutor};
use crate::scheduler::Scheduler;
use crate::violations::{ViolationLedger, ViolationRecord};

/// Host time between idle sweeps.
const SWEEP_INTERVAL_MS: u64 = 1_000;

/// Result of handing the engine one event or one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Verdicts emitted.
    pub verdicts: Vec<Verdict>,
    /// Punishments decided.
    pub punishments: Vec<Punishment>,
}

impl Outcome {
    /// True if no detector flagged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.verdicts.is_empty()
    }

    /// True if any verdict asks for rollback.
    #[must_use]
    pub fn rejected(&self) -> bool {
        self.verdicts.iter().any(|v| v.reject)
    }
}

/// Counters snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Events handed to the engine.
    pub events: u64,
    /// Events dropped as malformed.
    pub malformed: u64,
    /// Verdicts emitted.
    pub verdicts: u64,
    /// Punishments decided.
    pub punishments: u64,
    /// Deferred tasks discarded as stale.
    pub stale_tasks: u64,
    /// Detector invocations that panicked.
    pub faults: u64,
    /// Actors currently in session.
    pub tracked_actors: usize,
    /// Deferred tasks queued.
    pub pending_tasks: usize,
}

#[derive(Debug, Default)]
struct Counters {
    events: AtomicU64,
    malformed: AtomicU64,
    verdicts: AtomicU64,
    punishments: AtomicU64,
    stale_tasks: AtomicU64,
    faults: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// The detection and escalation engine.
pub struct Engine {
    config: EngineConfig,
    detectors: Vec<Box<dyn Detector>>,
    scheduler: Scheduler,
    ledger: ViolationLedger,
    policy: EscalationPolicy,
    executor: Box<dyn PunishmentExecutor>,
    actions: ActionSender,
    /// Last event time per actor in session.
    sessions: RwLock<HashMap<ActorId, AtomicU64>>,
    last_sweep: AtomicU64,
    counters: Counters,
}

impl Engine {
    /// Builds an engine.
    ///
    /// Detectors listed in `config.checks.disabled` are dropped.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid, two detectors share an id, or the
    /// disabled list names an unregistered detector.
    pub fn new(
        config: EngineConfig,
        detectors: Vec<Box<dyn Detector>>,
        executor: Box<dyn PunishmentExecutor>,
        actions: ActionSender,
    ) -> VigilResult<Self> {
        config.validate()?;

        let mut seen: Vec<CheckId> = Vec::with_capacity(detectors.len());
        for detector in &detectors {
            if seen.contains(&detector.id()) {
                return Err(VigilError::DuplicateCheck(detector.id()));
            }
            seen.push(detector.id());
        }
        if let Some(unknown) = config
            .checks
            .disabled
            .iter()
            .find(|name| !seen.iter().any(|id| id == name))
        {
            return Err(VigilError::UnknownCheck(unknown.clone()));
        }

        let detectors: Vec<_> = detectors
            .into_iter()
            .filter(|d| !config.checks.is_disabled(d.id()))
            .collect();

        tracing::info!(
            detectors = detectors.len(),
            threshold = config.escalation.threshold,
            "engine ready"
        );

        Ok(Self {
            policy: EscalationPolicy::from_config(&config.escalation),
            config,
            detectors,
            scheduler: Scheduler::new(),
            ledger: ViolationLedger::new(),
            executor,
            actions,
            sessions: RwLock::new(HashMap::new()),
            last_sweep: AtomicU64::new(0),
            counters: Counters::default(),
        })
    }

    /// Builds an engine whose punishments go out on the action bus too.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::new`].
    pub fn with_channel(
        config: EngineConfig,
        detectors: Vec<Box<dyn Detector>>,
    ) -> VigilResult<(Self, ActionReceiver)> {
        let bus = ActionBus::new(config.actions.capacity.max(1));
        let executor = ChannelExecutor::new(bus.sender());
        let receiver = bus.receiver();
        let engine = Self::new(config, detectors, Box::new(executor), bus.sender())?;
        Ok((engine, receiver))
    }

    /// Handles one event.
    pub fn handle(&self, event: &Event) -> Outcome {
        Counters::bump(&self.counters.events);

        if !event.is_well_formed() {
            Counters::bump(&self.counters.malformed);
            tracing::debug!(actor = %event.actor, kind = ?event.kind(), "malformed event dropped");
            return Outcome::default();
        }

        match &event.payload {
            EventPayload::Quit => {
                self.purge(event.actor);
                return Outcome::default();
            }
            EventPayload::Join { position } => {
                tracing::info!(actor = %event.actor, "actor joined");
                self.rebase(event.actor, event.at, *position, self.config.lifecycle.join_grace());
            }
            EventPayload::Teleport { to, cause, .. } => {
                tracing::debug!(actor = %event.actor, ?cause, "actor teleported");
                self.rebase(event.actor, event.at, *to, self.config.lifecycle.teleport_grace());
            }
            _ => {}
        }
        self.touch(event.actor, event.at);

        let kind = event.kind();
        let mut outcome = Outcome::default();
        for detector in &self.detectors {
            if !detector.interests().contains(kind) {
                continue;
            }
            let result = catch_unwind(AssertUnwindSafe(|| detector.handle(event, &self.scheduler)));
            match result {
                Ok(Some(verdict)) => self.apply(verdict, &mut outcome),
                Ok(None) => {}
                Err(_) => self.fault(detector.id(), event.actor),
            }
        }
        outcome
    }

    /// Advances host time: fires due deferred tasks and sweeps idle state.
    pub fn tick(&self, now: Timestamp) -> Outcome {
        let mut outcome = Outcome::default();

        for task in self.scheduler.pop_due(now) {
            let Some(detector) = self.detectors.iter().find(|d| d.id() == task.check) else {
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| {
                detector.fire(task.actor, task.id, now, &self.scheduler)
            }));
            match result {
                Ok(Fired::Stale) => {
                    Counters::bump(&self.counters.stale_tasks);
                    tracing::debug!(actor = %task.actor, check = task.check, task = %task.id, "stale task discarded");
                }
                Ok(Fired::Evaluated(Some(verdict))) => self.apply(verdict, &mut outcome),
                Ok(Fired::Evaluated(None)) => {}
                Err(_) => self.fault(task.check, task.actor),
            }
        }

        let last = self.last_sweep.load(Ordering::Relaxed);
        if now.as_millis().saturating_sub(last) >= SWEEP_INTERVAL_MS
            && self
                .last_sweep
                .compare_exchange(last, now.as_millis(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.sweep(now);
        }

        outcome
    }

    fn apply(&self, verdict: Verdict, outcome: &mut Outcome) {
        Counters::bump(&self.counters.verdicts);
        let total = self.ledger.record(&verdict);
        tracing::warn!(
            actor = %verdict.actor,
            check = verdict.check,
            severity = verdict.severity,
            total,
            detail = %verdict.detail,
            "violation"
        );

        self.actions.send(EngineAction::alert(&verdict, total));
        if verdict.reject {
            self.actions.send(EngineAction::Reject {
                actor: verdict.actor,
                check: verdict.check,
                at: verdict.at,
            });
        }

        if let Some(punishment) = self.policy.escalate(&self.ledger, &verdict) {
            Counters::bump(&self.counters.punishments);
            tracing::warn!(
                actor = %punishment.actor,
                trigger = punishment.trigger,
                score = punishment.score,
                "threshold reached, punishing"
            );
            self.executor.punish(&punishment);
            outcome.punishments.push(punishment);
        }
        outcome.verdicts.push(verdict);
    }

    fn fault(&self, check: CheckId, actor: ActorId) {
        Counters::bump(&self.counters.faults);
        tracing::error!(check, actor = %actor, "detector panicked; skipped");
    }

    fn rebase(&self, actor: ActorId, now: Timestamp, to: Vec3, grace: std::time::Duration) {
        for detector in &self.detectors {
            if catch_unwind(AssertUnwindSafe(|| detector.rebase(actor, now, to, grace))).is_err() {
                self.fault(detector.id(), actor);
            }
        }
    }

    fn touch(&self, actor: ActorId, at: Timestamp) {
        if let Some(last) = self.sessions.read().get(&actor) {
            last.fetch_max(at.as_millis(), Ordering::Relaxed);
            return;
        }
        self.sessions
            .write()
            .entry(actor)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_max(at.as_millis(), Ordering::Relaxed);
    }

    fn purge(&self, actor: ActorId) {
        for detector in &self.detectors {
            detector.forget(actor);
        }
        let cancelled = self.scheduler.cancel_actor(actor);
        let had_score = self.ledger.remove(actor);
        self.sessions.write().remove(&actor);
        tracing::info!(actor = %actor, cancelled, had_score, "actor quit, state purged");
    }

    fn sweep(&self, now: Timestamp) {
        let idle = self.config.lifecycle.idle_eviction();
        let evicted: usize = self
            .detectors
            .iter()
            .map(|d| d.evict_idle(now, idle))
            .sum();
        if evicted > 0 {
            tracing::debug!(evicted, "idle detector state evicted");
        }

        let idle_ms = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX);
        let is_idle =
            |last: &AtomicU64| now.as_millis().saturating_sub(last.load(Ordering::Relaxed)) > idle_ms;
        let stale: Vec<ActorId> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, last)| is_idle(*last))
            .map(|(actor, _)| *actor)
            .collect();
        if stale.is_empty() {
            return;
        }

        let threshold = self.config.escalation.threshold;
        let mut sessions = self.sessions.write();
        for actor in stale {
            // An event may have arrived since the read pass.
            if !sessions.get(&actor).is_some_and(is_idle) {
                continue;
            }
            sessions.remove(&actor);
            let cancelled = self.scheduler.cancel_actor(actor);
            let dropped_score = self.ledger.remove_below(actor, threshold);
            tracing::debug!(actor = %actor, cancelled, dropped_score, "idle session evicted");
        }
    }

    /// Snapshot of an actor's violations.
    #[must_use]
    pub fn violations(&self, actor: ActorId) -> Option<ViolationRecord> {
        self.ledger.get(actor)
    }

    /// Zeroes an actor's violations. Returns whether they had a record.
    pub fn reset_violations(&self, actor: ActorId) -> bool {
        let existed = self.ledger.reset(actor);
        if existed {
            tracing::info!(actor = %actor, "violations reset");
        }
        existed
    }

    /// Actors with the highest scores.
    #[must_use]
    pub fn top_violators(&self, limit: usize) -> Vec<(ActorId, u32)> {
        self.ledger.top(limit)
    }

    /// True while the actor is in session.
    #[must_use]
    pub fn is_tracked(&self, actor: ActorId) -> bool {
        self.sessions.read().contains_key(&actor)
    }

    /// Ids of active detectors, in registration order.
    #[must_use]
    pub fn detector_ids(&self) -> Vec<CheckId> {
        self.detectors.iter().map(|d| d.id()).collect()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        EngineStats {
            events: load(&self.counters.events),
            malformed: load(&self.counters.malformed),
            verdicts: load(&self.counters.verdicts),
            punishments: load(&self.counters.punishments),
            stale_tasks: load(&self.counters.stale_tasks),
            faults: load(&self.counters.faults),
            tracked_actors: self.sessions.read().len(),
            pending_tasks: self.scheduler.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::check::{Check, CheckContext, CheckRunner, Flag};
    use crate::store::ActorState;
    use vigil_shared::testing::{join, ms, quit, teleport, MoveBuilder};
    use vigil_shared::{EventKind, EventMask};

    /// Flags every displacement longer than one block.
    struct Jump;

    impl Check for Jump {
        type State = ();

        fn id(&self) -> CheckId {
            "jump"
        }

        fn interests(&self) -> EventMask {
            EventMask::of(&[EventKind::PositionUpdate])
        }

        fn evaluate(&self, _: &mut ActorState<()>, event: &Event, cx: &mut CheckContext) -> Option<Flag> {
            let EventPayload::PositionUpdate(m) = &event.payload else {
                return None;
            };
            if m.from.distance_squared(m.to) > 1.0 {
                cx.defer(Duration::from_millis(100));
                Some(Flag::new("long step").with_severity(2).rejecting())
            } else {
                None
            }
        }

        fn on_deferred(&self, _: &mut ActorState<()>, _: &mut CheckContext) -> Option<Flag> {
            Some(Flag::new("follow-up"))
        }
    }

    /// Panics on every event.
    struct Faulty;

    impl Check for Faulty {
        type State = ();

        fn id(&self) -> CheckId {
            "faulty"
        }

        fn interests(&self) -> EventMask {
            EventMask::of(&[EventKind::PositionUpdate])
        }

        fn evaluate(&self, _: &mut ActorState<()>, _: &Event, _: &mut CheckContext) -> Option<Flag> {
            panic!("boom");
        }
    }

    fn engine_with(threshold: u32) -> (Engine, ActionReceiver) {
        let mut config = EngineConfig::default();
        config.escalation.threshold = threshold;
        Engine::with_channel(config, vec![CheckRunner::boxed(Jump)]).unwrap()
    }

    fn long_step(actor: ActorId, at: u64) -> Event {
        MoveBuilder::new(actor, ms(at)).step_x(Vec3::ZERO, 3.0).build()
    }

    #[test]
    fn test_verdict_flows_to_ledger_and_bus() {
        let (engine, actions) = engine_with(100);
        let actor = ActorId::random();

        let outcome = engine.handle(&long_step(actor, 0));
        assert_eq!(outcome.verdicts.len(), 1);
        assert!(outcome.rejected());
        assert_eq!(engine.violations(actor).unwrap().total(), 2);

        let drained = actions.drain();
        assert!(matches!(drained[0], EngineAction::Alert { total: 2, .. }));
        assert!(matches!(drained[1], EngineAction::Reject { check: "jump", .. }));
    }

    #[test]
    fn test_escalation_once_and_score_zero() {
        let (engine, actions) = engine_with(4);
        let actor = ActorId::random();

        let mut punished = 0;
        for i in 0..3 {
            punished += engine.handle(&long_step(actor, i * 50)).punishments.len();
        }
        assert_eq!(punished, 1);
        assert_eq!(engine.stats().punishments, 1);
        // Third verdict lands after the reset.
        assert_eq!(engine.violations(actor).unwrap().total(), 2);

        let punishes = actions
            .drain()
            .into_iter()
            .filter(|a| matches!(a, EngineAction::Punish(_)))
            .count();
        assert_eq!(punishes, 1);
    }

    #[test]
    fn test_deferred_fires_on_tick() {
        let (engine, _actions) = engine_with(100);
        let actor = ActorId::random();

        engine.handle(&long_step(actor, 0));
        assert!(engine.tick(ms(50)).is_clean());

        let outcome = engine.tick(ms(100));
        assert_eq!(outcome.verdicts.len(), 1);
        assert_eq!(outcome.verdicts[0].detail, "follow-up");
        assert_eq!(engine.violations(actor).unwrap().total(), 3);
    }

    #[test]
    fn test_quit_purges_everything() {
        let (engine, _actions) = engine_with(100);
        let actor = ActorId::random();

        engine.handle(&join(actor, ms(0)));
        engine.handle(&long_step(actor, 2_000));
        assert!(engine.is_tracked(actor));
        assert_eq!(engine.stats().pending_tasks, 1);

        engine.handle(&quit(actor, ms(2_050)));
        assert!(!engine.is_tracked(actor));
        assert!(engine.violations(actor).is_none());
        assert_eq!(engine.stats().pending_tasks, 0);
        assert!(engine.tick(ms(5_000)).is_clean());
    }

    #[test]
    fn test_teleport_grace_suppresses() {
        let (engine, _actions) = engine_with(100);
        let actor = ActorId::random();

        engine.handle(&teleport(actor, ms(1_000), Vec3::new(100.0, 64.0, 100.0)));
        assert!(engine.handle(&long_step(actor, 1_100)).is_clean());
        assert!(engine.handle(&long_step(actor, 2_499)).is_clean());
        assert!(!engine.handle(&long_step(actor, 2_500)).is_clean());
    }

    #[test]
    fn test_malformed_event_dropped() {
        let (engine, _actions) = engine_with(100);
        let actor = ActorId::random();
        let bad = MoveBuilder::new(actor, ms(0))
            .between(Vec3::ZERO, Vec3::new(f64::NAN, 0.0, 0.0))
            .build();

        assert!(engine.handle(&bad).is_clean());
        assert_eq!(engine.stats().malformed, 1);
        assert!(!engine.is_tracked(actor));
    }

    #[test]
    fn test_faulty_detector_isolated() {
        let (engine, _actions) = Engine::with_channel(
            EngineConfig::default(),
            vec![CheckRunner::boxed(Faulty), CheckRunner::boxed(Jump)],
        )
        .unwrap();
        let actor = ActorId::random();

        let outcome = engine.handle(&long_step(actor, 0));
        assert_eq!(outcome.verdicts.len(), 1);
        assert_eq!(outcome.verdicts[0].check, "jump");
        assert_eq!(engine.stats().faults, 1);

        // Still usable afterwards.
        assert_eq!(engine.handle(&long_step(actor, 50)).verdicts.len(), 1);
    }

    #[test]
    fn test_construction_errors() {
        let dup = Engine::with_channel(
            EngineConfig::default(),
            vec![CheckRunner::boxed(Jump), CheckRunner::boxed(Jump)],
        );
        assert!(matches!(dup, Err(VigilError::DuplicateCheck("jump"))));

        let mut config = EngineConfig::default();
        config.checks.disabled = vec!["nonexistent".into()];
        let unknown = Engine::with_channel(config, vec![CheckRunner::boxed(Jump)]);
        assert!(matches!(unknown, Err(VigilError::UnknownCheck(_))));

        let mut config = EngineConfig::default();
        config.escalation.threshold = 0;
        assert!(Engine::with_channel(config, vec![]).is_err());
    }

    #[test]
    fn test_disabled_detector_not_run() {
        let mut config = EngineConfig::default();
        config.checks.disabled = vec!["jump".into()];
        let (engine, _actions) = Engine::with_channel(config, vec![CheckRunner::boxed(Jump)]).unwrap();

        assert!(engine.detector_ids().is_empty());
        assert!(engine.handle(&long_step(ActorId::random(), 0)).is_clean());
    }

    #[test]
    fn test_idle_sweep() {
        let (engine, _actions) = engine_with(100);
        let actor = ActorId::random();
        engine.handle(&MoveBuilder::new(actor, ms(0)).step_x(Vec3::ZERO, 0.1).build());

        engine.tick(ms(1_000));
        assert_eq!(engine.detectors[0].tracked(), 1);

        engine.tick(ms(301_000));
        assert_eq!(engine.detectors[0].tracked(), 0);
        assert!(!engine.is_tracked(actor));
        assert_eq!(engine.stats().tracked_actors, 0);
    }

    #[test]
    fn test_idle_sweep_keeps_recent_sessions() {
        let (engine, _actions) = engine_with(100);
        let idle = ActorId::random();
        let busy = ActorId::random();
        engine.handle(&long_step(idle, 0));
        engine.handle(&long_step(busy, 0));
        engine.tick(ms(1_000));
        engine.handle(&long_step(busy, 250_000));
        engine.tick(ms(250_200));
        // Long step (2) plus follow-up (1), once for idle and twice for busy.
        assert_eq!(engine.violations(idle).unwrap().total(), 3);
        assert_eq!(engine.violations(busy).unwrap().total(), 6);

        engine.tick(ms(301_000));
        assert!(!engine.is_tracked(idle));
        assert!(engine.violations(idle).is_none());
        assert!(engine.is_tracked(busy));
        assert_eq!(engine.violations(busy).unwrap().total(), 6);
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
