//! # Per-Actor State Store
//!
//! One store per detector. Each actor's record sits behind its own mutex, so
//! evaluating one actor never waits on another; the map lock is only held
//! long enough to look up or insert an entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use vigil_shared::{ActorId, Timestamp};

use crate::scheduler::TaskId;

/// State a detector keeps about one actor.
#[derive(Clone, Debug, Default)]
pub struct ActorState<D> {
    /// Detector-specific record (windows, baselines).
    pub data: D,
    /// Timestamp of the last event seen by this detector.
    pub last_event: Option<Timestamp>,
    /// Checks are suppressed until this instant.
    pub exempt_until: Option<Timestamp>,
    /// Consecutive suspicious observations.
    pub suspicious_ticks: u32,
    /// Outstanding deferred re-evaluation, if any.
    pub pending_task: Option<TaskId>,
}

impl<D: Default> ActorState<D> {
    /// True while `now` is inside the grace period.
    #[must_use]
    pub fn in_grace(&self, now: Timestamp) -> bool {
        self.exempt_until.is_some_and(|until| now < until)
    }

    /// Forgets windows, baselines and counters, keeping timing fields.
    pub fn reset_baseline(&mut self) {
        self.data = D::default();
        self.suspicious_ticks = 0;
        self.pending_task = None;
    }
}

/// Shared handle to one actor's state.
pub type StateHandle<D> = Arc<Mutex<ActorState<D>>>;

/// Map of actor to state, created lazily.
#[derive(Debug)]
pub struct ActorStateStore<D> {
    states: RwLock<HashMap<ActorId, StateHandle<D>>>,
}

impl<D: Default> Default for ActorStateStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Default> ActorStateStore<D> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the actor's state, creating it on first use.
    pub fn entry(&self, actor: ActorId) -> StateHandle<D> {
        if let Some(state) = self.states.read().get(&actor) {
            return Arc::clone(state);
        }
        Arc::clone(
            self.states
                .write()
                .entry(actor)
                .or_insert_with(|| Arc::new(Mutex::new(ActorState::default()))),
        )
    }

    /// Returns the actor's state if it exists.
    #[must_use]
    pub fn get(&self, actor: ActorId) -> Option<StateHandle<D>> {
        self.states.read().get(&actor).cloned()
    }

    /// Drops the actor's state. Returns whether there was any.
    pub fn remove(&self, actor: ActorId) -> bool {
        self.states.write().remove(&actor).is_some()
    }

    /// True if the actor has state.
    #[must_use]
    pub fn contains(&self, actor: ActorId) -> bool {
        self.states.read().contains_key(&actor)
    }

    /// Number of actors with state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// True when no actor has state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }

    /// Drops every state whose last event is older than `idle`.
    ///
    /// States that never saw an event are left alone. Returns the number
    /// removed.
    pub fn evict_idle(&self, now: Timestamp, idle: Duration) -> usize {
        let mut states = self.states.write();
        let before = states.len();
        states.retain(|_, state| {
            state
                .lock()
                .last_event
                .map_or(true, |last| now.since(last) <= idle)
        });
        before - states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        hits: u32,
    }

    #[test]
    fn test_lazy_creation_and_removal() {
        let store: ActorStateStore<Counter> = ActorStateStore::new();
        let actor = ActorId::random();

        assert!(store.get(actor).is_none());
        store.entry(actor).lock().data.hits += 1;
        store.entry(actor).lock().data.hits += 1;
        assert_eq!(store.get(actor).unwrap().lock().data.hits, 2);
        assert_eq!(store.len(), 1);

        assert!(store.remove(actor));
        assert!(!store.remove(actor));
        assert!(store.is_empty());
    }

    #[test]
    fn test_idle_eviction() {
        let store: ActorStateStore<Counter> = ActorStateStore::new();
        let stale = ActorId::random();
        let fresh = ActorId::random();

        store.entry(stale).lock().last_event = Some(Timestamp::from_millis(0));
        store.entry(fresh).lock().last_event = Some(Timestamp::from_millis(290_000));

        let removed = store.evict_idle(Timestamp::from_millis(301_000), Duration::from_secs(300));
        assert_eq!(removed, 1);
        assert!(!store.contains(stale));
        assert!(store.contains(fresh));
    }

    #[test]
    fn test_grace_and_baseline_reset() {
        let mut state: ActorState<Counter> = ActorState::default();
        state.exempt_until = Some(Timestamp::from_millis(1_500));
        assert!(state.in_grace(Timestamp::from_millis(1_499)));
        assert!(!state.in_grace(Timestamp::from_millis(1_500)));

        state.data.hits = 7;
        state.suspicious_ticks = 3;
        state.reset_baseline();
        assert_eq!(state.data.hits, 0);
        assert_eq!(state.suspicious_ticks, 0);
        assert_eq!(state.exempt_until, Some(Timestamp::from_millis(1_500)));
    }

    #[test]
    fn test_concurrent_actors() {
        let store: Arc<ActorStateStore<Counter>> = Arc::new(ActorStateStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let actor = ActorId::random();
                    for _ in 0..100 {
                        store.entry(actor).lock().data.hits += 1;
                    }
                    actor
                })
            })
            .collect();

        for handle in handles {
            let actor = handle.join().unwrap();
            assert_eq!(store.get(actor).unwrap().lock().data.hits, 100);
        }
        assert_eq!(store.len(), 8);
    }
}
