//! # Violation Ledger
//!
//! Per-actor violation totals split by category. Each actor's record is
//! mutated under its own lock, so verdicts for different actors are applied
//! concurrently while one actor's verdicts apply atomically. Scores never
//! decay; they are cleared by escalation, an admin reset, Quit, or idle
//! eviction of an actor still below the threshold.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use vigil_shared::ActorId;

use crate::check::{CheckId, Verdict};

/// One actor's accumulated score.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViolationRecord {
    total: u32,
    per_check: BTreeMap<CheckId, u32>,
}

impl ViolationRecord {
    /// Total score (equals the sum over categories).
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Score for one category.
    #[must_use]
    pub fn for_check(&self, check: &str) -> u32 {
        self.per_check.get(check).copied().unwrap_or(0)
    }

    /// Categories with a non-zero score, in id order.
    pub fn categories(&self) -> impl Iterator<Item = (CheckId, u32)> + '_ {
        self.per_check.iter().map(|(check, score)| (*check, *score))
    }

    /// Saturates at `u32::MAX`; the same clamped amount goes to the total
    /// and the category so the two never drift apart.
    fn add(&mut self, check: CheckId, severity: u32) -> u32 {
        let applied = severity.min(u32::MAX - self.total);
        *self.per_check.entry(check).or_insert(0) += applied;
        self.total += applied;
        self.total
    }
}

/// All actors' records.
#[derive(Debug, Default)]
pub struct ViolationLedger {
    records: RwLock<HashMap<ActorId, Arc<Mutex<ViolationRecord>>>>,
}

impl ViolationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, actor: ActorId) -> Arc<Mutex<ViolationRecord>> {
        if let Some(record) = self.records.read().get(&actor) {
            return Arc::clone(record);
        }
        Arc::clone(self.records.write().entry(actor).or_default())
    }

    /// Adds the verdict's severity. Returns the actor's new total.
    pub fn record(&self, verdict: &Verdict) -> u32 {
        self.entry(verdict.actor)
            .lock()
            .add(verdict.check, verdict.severity)
    }

    /// Snapshot of the actor's record.
    #[must_use]
    pub fn get(&self, actor: ActorId) -> Option<ViolationRecord> {
        self.records
            .read()
            .get(&actor)
            .map(|record| record.lock().clone())
    }

    /// Zeroes the actor's record. Returns whether it existed.
    pub fn reset(&self, actor: ActorId) -> bool {
        match self.records.read().get(&actor) {
            Some(record) => {
                *record.lock() = ViolationRecord::default();
                true
            }
            None => false,
        }
    }

    /// Drops the actor's record.
    pub fn remove(&self, actor: ActorId) -> bool {
        self.records.write().remove(&actor).is_some()
    }

    /// If the total is at least `threshold`, atomically zeroes the record
    /// and returns what it held. At most one caller observes each crossing.
    pub fn take_if_at_least(&self, actor: ActorId, threshold: u32) -> Option<ViolationRecord> {
        let record = self.records.read().get(&actor).cloned()?;
        let mut record = record.lock();
        if record.total >= threshold {
            Some(std::mem::take(&mut *record))
        } else {
            None
        }
    }

    /// Drops the actor's record if its total is under `threshold`. Returns
    /// whether it was dropped.
    pub fn remove_below(&self, actor: ActorId, threshold: u32) -> bool {
        let mut records = self.records.write();
        let below = records
            .get(&actor)
            .is_some_and(|record| record.lock().total < threshold);
        if below {
            records.remove(&actor);
        }
        below
    }

    /// Number of actors with a record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when no actor has a record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Actors with a non-zero total, highest first.
    #[must_use]
    pub fn top(&self, limit: usize) -> Vec<(ActorId, u32)> {
        let mut scores: Vec<_> = self
            .records
            .read()
            .iter()
            .map(|(actor, record)| (*actor, record.lock().total))
            .filter(|(_, total)| *total > 0)
            .collect();
        scores.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scores.truncate(limit);
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_shared::Timestamp;

    fn verdict(actor: ActorId, check: CheckId, severity: u32) -> Verdict {
        Verdict {
            actor,
            check,
            at: Timestamp::ZERO,
            severity,
            reject: false,
            detail: String::new(),
        }
    }

    #[test]
    fn test_additivity() {
        let ledger = ViolationLedger::new();
        let actor = ActorId::random();
        let severities = [("speed", 1), ("scaffold", 3), ("speed", 2), ("reach", 5)];

        let mut last = 0;
        for (check, severity) in severities {
            last = ledger.record(&verdict(actor, check, severity));
        }

        let record = ledger.get(actor).unwrap();
        assert_eq!(last, 11);
        assert_eq!(record.total(), 11);
        assert_eq!(record.for_check("speed"), 3);
        assert_eq!(record.for_check("scaffold"), 3);
        assert_eq!(record.for_check("fast_place"), 0);
        assert_eq!(record.categories().map(|(_, s)| s).sum::<u32>(), record.total());
    }

    #[test]
    fn test_saturation_keeps_total_equal_to_categories() {
        let ledger = ViolationLedger::new();
        let actor = ActorId::random();
        ledger.record(&verdict(actor, "speed", u32::MAX - 10));
        let total = ledger.record(&verdict(actor, "reach", 100));
        assert_eq!(total, u32::MAX);

        let record = ledger.get(actor).unwrap();
        assert_eq!(record.for_check("reach"), 10);
        assert_eq!(record.categories().map(|(_, s)| s).sum::<u32>(), record.total());

        // Full: further verdicts add nothing anywhere.
        ledger.record(&verdict(actor, "scaffold", 5));
        let record = ledger.get(actor).unwrap();
        assert_eq!(record.for_check("scaffold"), 0);
        assert_eq!(record.categories().map(|(_, s)| s).sum::<u32>(), record.total());
    }

    #[test]
    fn test_remove_below_spares_high_scores() {
        let ledger = ViolationLedger::new();
        let low = ActorId::random();
        let high = ActorId::random();
        ledger.record(&verdict(low, "speed", 4));
        ledger.record(&verdict(high, "speed", 9));

        assert!(ledger.remove_below(low, 5));
        assert!(!ledger.remove_below(high, 5));
        assert!(!ledger.remove_below(ActorId::random(), 5));
        assert!(ledger.get(low).is_none());
        assert_eq!(ledger.get(high).unwrap().total(), 9);
    }

    #[test]
    fn test_take_if_at_least_is_once() {
        let ledger = ViolationLedger::new();
        let actor = ActorId::random();
        ledger.record(&verdict(actor, "speed", 4));

        assert!(ledger.take_if_at_least(actor, 5).is_none());
        ledger.record(&verdict(actor, "speed", 1));

        let taken = ledger.take_if_at_least(actor, 5).unwrap();
        assert_eq!(taken.total(), 5);
        assert!(ledger.take_if_at_least(actor, 5).is_none());
        assert_eq!(ledger.get(actor).unwrap().total(), 0);
    }

    #[test]
    fn test_reset_and_remove() {
        let ledger = ViolationLedger::new();
        let actor = ActorId::random();
        assert!(!ledger.reset(actor));

        ledger.record(&verdict(actor, "reach", 2));
        assert!(ledger.reset(actor));
        assert_eq!(ledger.get(actor).unwrap().total(), 0);

        assert!(ledger.remove(actor));
        assert!(ledger.get(actor).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_top() {
        let ledger = ViolationLedger::new();
        let low = ActorId::random();
        let high = ActorId::random();
        let clean = ActorId::random();
        ledger.record(&verdict(low, "speed", 1));
        ledger.record(&verdict(high, "speed", 9));
        ledger.record(&verdict(clean, "speed", 1));
        ledger.reset(clean);

        assert_eq!(ledger.top(10), vec![(high, 9), (low, 1)]);
        assert_eq!(ledger.top(1), vec![(high, 9)]);
    }

    #[test]
    fn test_concurrent_records() {
        let ledger = Arc::new(ViolationLedger::new());
        let actor = ActorId::random();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        ledger.record(&verdict(actor, "speed", 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.get(actor).unwrap().total(), 1_000);
    }
}
