//! # Deferred Re-evaluation
//!
//! A detector that needs to look again later (did fall damage arrive after a
//! landing?) schedules a one-shot task. Task ids only grow; the id is also
//! stored in the actor's state, and a task whose id no longer matches when it
//! comes due is stale and dropped. Cancelling therefore never has to find
//! the queued entry.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use vigil_shared::{ActorId, Timestamp};

use crate::check::CheckId;

/// Identity of one scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A queued task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledTask {
    /// Task id.
    pub id: TaskId,
    /// When it should run.
    pub due: Timestamp,
    /// Actor it concerns.
    pub actor: ActorId,
    /// Detector that owns it.
    pub check: CheckId,
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of deferred tasks ordered by due time.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: AtomicU64,
    queue: Mutex<BinaryHeap<Reverse<ScheduledTask>>>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task and returns its id.
    pub fn schedule(&self, actor: ActorId, check: CheckId, due: Timestamp) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed) + 1);
        self.queue.lock().push(Reverse(ScheduledTask {
            id,
            due,
            actor,
            check,
        }));
        id
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    pub fn pop_due(&self, now: Timestamp) -> Vec<ScheduledTask> {
        let mut queue = self.queue.lock();
        let mut due = Vec::new();
        while queue.peek().is_some_and(|Reverse(task)| task.due <= now) {
            if let Some(Reverse(task)) = queue.pop() {
                due.push(task);
            }
        }
        due
    }

    /// Drops every task for `actor`. Returns how many were dropped.
    pub fn cancel_actor(&self, actor: ActorId) -> usize {
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.retain(|Reverse(task)| task.actor != actor);
        before - queue.len()
    }

    /// Number of queued tasks, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
