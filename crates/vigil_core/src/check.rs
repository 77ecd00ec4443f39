//! # Check Framework
//!
//! Every detector implements [`Check`] and is wrapped in a [`CheckRunner`],
//! which owns its per-actor state and applies the shared gating order before
//! the detector's own rule ever runs:
//!
//! 1. exempt condition: counters cleared, no verdict
//! 2. grace period: bookkeeping only, no verdict
//! 3. no meaningful delta: no verdict, windows untouched
//! 4. evaluate
//!
//! The engine talks to runners through the object-safe [`Detector`] trait so
//! that detectors with different state types share one registry.

use std::time::Duration;

use vigil_shared::{ActorId, Event, EventMask, Timestamp, Vec3};

use crate::scheduler::{Scheduler, TaskId};
use crate::store::{ActorState, ActorStateStore};

/// Stable detector identifier, also the violation category.
pub type CheckId = &'static str;

/// A detector's finding on one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flag {
    /// Score contribution.
    pub severity: u32,
    /// Ask the host to roll the action back.
    pub reject: bool,
    /// Human-readable evidence.
    pub detail: String,
}

impl Flag {
    /// Severity 1, not rejected.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            severity: 1,
            reject: false,
            detail: detail.into(),
        }
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: u32) -> Self {
        self.severity = severity;
        self
    }

    /// Requests rollback.
    #[must_use]
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }
}

/// Immutable outcome of a flagged evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    /// Offending actor.
    pub actor: ActorId,
    /// Detector that flagged.
    pub check: CheckId,
    /// Host time of the evaluated event (or of the deferred fire).
    pub at: Timestamp,
    /// Score contribution.
    pub severity: u32,
    /// Host should roll the action back.
    pub reject: bool,
    /// Evidence.
    pub detail: String,
}

/// Side requests a check can make while evaluating.
#[derive(Debug)]
pub struct CheckContext {
    now: Timestamp,
    defer: Option<Duration>,
    cancel: bool,
}

impl CheckContext {
    /// Context for an evaluation at `now`.
    #[must_use]
    pub const fn new(now: Timestamp) -> Self {
        Self {
            now,
            defer: None,
            cancel: false,
        }
    }

    /// Host time of the evaluation.
    #[must_use]
    pub const fn now(&self) -> Timestamp {
        self.now
    }

    /// Re-evaluate this actor after `delay` via [`Check::on_deferred`].
    /// Replaces any outstanding task.
    pub fn defer(&mut self, delay: Duration) {
        self.defer = Some(delay);
    }

    /// Invalidate the outstanding task.
    pub fn cancel_deferred(&mut self) {
        self.cancel = true;
    }
}

/// A detector rule.
///
/// Implementations are pure functions of the event and the actor's own
/// state: no I/O, no blocking, no shared mutable state.
pub trait Check: Send + Sync + 'static {
    /// Per-actor record.
    type State: Default + Send + 'static;

    /// Detector id.
    fn id(&self) -> CheckId;

    /// Event kinds this detector is routed.
    fn interests(&self) -> EventMask;

    /// Exempt condition. Defaults to observer modes, sanctioned flight,
    /// gliding and riding.
    fn is_exempt(&self, event: &Event) -> bool {
        event
            .status()
            .is_some_and(vigil_shared::ActorStatus::is_unbound_by_physics)
    }

    /// Called instead of evaluation while exempt.
    fn on_exempt(&self, state: &mut ActorState<Self::State>) {
        state.suspicious_ticks = 0;
    }

    /// Bookkeeping during grace (e.g. moving the position baseline).
    fn track(&self, _data: &mut Self::State, _event: &Event) {}

    /// False when the event carries nothing to evaluate.
    fn has_delta(&self, _event: &Event) -> bool {
        true
    }

    /// The rule.
    fn evaluate(
        &self,
        state: &mut ActorState<Self::State>,
        event: &Event,
        cx: &mut CheckContext,
    ) -> Option<Flag>;

    /// Context discontinuity (teleport, join). Default drops the record.
    fn on_teleport(&self, state: &mut ActorState<Self::State>, _to: Vec3) {
        state.reset_baseline();
    }

    /// A deferred task scheduled through [`CheckContext::defer`] came due.
    fn on_deferred(
        &self,
        _state: &mut ActorState<Self::State>,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        None
    }
}

/// Result of firing a deferred task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fired {
    /// Actor gone or task superseded; nothing ran.
    Stale,
    /// The check re-evaluated.
    Evaluated(Option<Verdict>),
}

/// Object-safe face of a [`CheckRunner`].
pub trait Detector: Send + Sync {
    /// Detector id.
    fn id(&self) -> CheckId;

    /// Event kinds this detector is routed.
    fn interests(&self) -> EventMask;

    /// Runs the gating order and the rule for one event.
    fn handle(&self, event: &Event, scheduler: &Scheduler) -> Option<Verdict>;

    /// Runs a due deferred task.
    fn fire(&self, actor: ActorId, task: TaskId, now: Timestamp, scheduler: &Scheduler) -> Fired;

    /// Resets baselines and starts a grace period.
    fn rebase(&self, actor: ActorId, now: Timestamp, to: Vec3, grace: Duration);

    /// Drops all state for the actor.
    fn forget(&self, actor: ActorId);

    /// Drops state idle for longer than `idle`.
    fn evict_idle(&self, now: Timestamp, idle: Duration) -> usize;

    /// Number of actors with state.
    fn tracked(&self) -> usize;
}

/// Owns a check and its state store.
pub struct CheckRunner<C: Check> {
    check: C,
    store: ActorStateStore<C::State>,
}

impl<C: Check> CheckRunner<C> {
    /// Wraps a check.
    #[must_use]
    pub fn new(check: C) -> Self {
        Self {
            check,
            store: ActorStateStore::new(),
        }
    }

    /// Boxes a check for the registry.
    #[must_use]
    pub fn boxed(check: C) -> Box<dyn Detector> {
        Box::new(Self::new(check))
    }

    /// The wrapped check.
    #[must_use]
    pub const fn check(&self) -> &C {
        &self.check
    }

    /// The state store.
    #[must_use]
    pub const fn store(&self) -> &ActorStateStore<C::State> {
        &self.store
    }

    fn apply_context(
        &self,
        actor: ActorId,
        state: &mut ActorState<C::State>,
        cx: &CheckContext,
        scheduler: &Scheduler,
    ) {
        if cx.cancel {
            state.pending_task = None;
        }
        if let Some(delay) = cx.defer {
            let due = cx.now.after(delay);
            state.pending_task = Some(scheduler.schedule(actor, self.check.id(), due));
        }
    }

    fn verdict(&self, actor: ActorId, at: Timestamp, flag: Flag) -> Verdict {
        Verdict {
            actor,
            check: self.check.id(),
            at,
            severity: flag.severity,
            reject: flag.reject,
            detail: flag.detail,
        }
    }
}

impl<C: Check> Detector for CheckRunner<C> {
    fn id(&self) -> CheckId {
        self.check.id()
    }

    fn interests(&self) -> EventMask {
        self.check.interests()
    }

    fn handle(&self, event: &Event, scheduler: &Scheduler) -> Option<Verdict> {
        if !self.check.interests().contains(event.kind()) {
            return None;
        }

        let handle = self.store.entry(event.actor);
        let mut state = handle.lock();
        state.last_event = Some(event.at);

        if self.check.is_exempt(event) {
            self.check.on_exempt(&mut state);
            return None;
        }

        if state.in_grace(event.at) {
            self.check.track(&mut state.data, event);
            return None;
        }

        if !self.check.has_delta(event) {
            return None;
        }

        let mut cx = CheckContext::new(event.at);
        let flag = self.check.evaluate(&mut state, event, &mut cx);
        self.apply_context(event.actor, &mut state, &cx, scheduler);
        flag.map(|flag| self.verdict(event.actor, event.at, flag))
    }

    fn fire(&self, actor: ActorId, task: TaskId, now: Timestamp, scheduler: &Scheduler) -> Fired {
        let Some(handle) = self.store.get(actor) else {
            return Fired::Stale;
        };
        let mut state = handle.lock();
        if state.pending_task != Some(task) {
            return Fired::Stale;
        }
        state.pending_task = None;

        let mut cx = CheckContext::new(now);
        let flag = self.check.on_deferred(&mut state, &mut cx);
        self.apply_context(actor, &mut state, &cx, scheduler);
        Fired::Evaluated(flag.map(|flag| self.verdict(actor, now, flag)))
    }

    fn rebase(&self, actor: ActorId, now: Timestamp, to: Vec3, grace: Duration) {
        let handle = self.store.entry(actor);
        let mut state = handle.lock();
        self.check.on_teleport(&mut state, to);
        state.suspicious_ticks = 0;
        state.pending_task = None;
        state.last_event = Some(now);
        state.exempt_until = Some(now.after(grace));
    }

    fn forget(&self, actor: ActorId) {
        self.store.remove(actor);
    }

    fn evict_idle(&self, now: Timestamp, idle: Duration) -> usize {
        self.store.evict_idle(now, idle)
    }

    fn tracked(&self) -> usize {
        self.store.len()
    }
}
