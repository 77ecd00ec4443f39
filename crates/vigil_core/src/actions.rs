//! # Outbound Actions
//!
//! Alerts, rejections and sanctions flow from the engine to the host over a
//! bounded crossbeam channel. Sends never block the event path: when the
//! host falls behind, actions are dropped and logged.
//!
//! ```text
//! ┌──────────┐   EngineAction   ┌─────────────┐
//! │  Engine  │─────────────────>│    Host     │
//! │ (events) │  bounded channel │ (notify,    │
//! └──────────┘                  │  kick, ban) │
//!                               └─────────────┘
//! ```

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use vigil_shared::{ActorId, Timestamp};

use crate::check::{CheckId, Verdict};
use crate::escalation::Punishment;

/// Something the host should act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineAction {
    /// A detector flagged the actor. For operator notification.
    Alert {
        /// Offending actor.
        actor: ActorId,
        /// Detector that flagged.
        check: CheckId,
        /// Score contribution of this flag.
        severity: u32,
        /// Actor total after this flag.
        total: u32,
        /// Evidence.
        detail: String,
        /// Host time.
        at: Timestamp,
    },

    /// Roll back the actor's last action.
    Reject {
        /// Offending actor.
        actor: ActorId,
        /// Detector that asked.
        check: CheckId,
        /// Host time.
        at: Timestamp,
    },

    /// Sanction the actor.
    Punish(Punishment),
}

impl EngineAction {
    /// Alert for a recorded verdict.
    #[must_use]
    pub fn alert(verdict: &Verdict, total: u32) -> Self {
        Self::Alert {
            actor: verdict.actor,
            check: verdict.check,
            severity: verdict.severity,
            total,
            detail: verdict.detail.clone(),
            at: verdict.at,
        }
    }

    /// Actor the action concerns.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        match self {
            Self::Alert { actor, .. } | Self::Reject { actor, .. } => *actor,
            Self::Punish(punishment) => punishment.actor,
        }
    }
}

/// Bounded action channel.
pub struct ActionBus {
    sender: Sender<EngineAction>,
    receiver: Receiver<EngineAction>,
}

impl ActionBus {
    /// Creates a bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum actions in flight before new ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> ActionSender {
        ActionSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> ActionReceiver {
        ActionReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a connected pair of handles.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (ActionSender, ActionReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Engine-side handle.
#[derive(Clone)]
pub struct ActionSender {
    sender: Sender<EngineAction>,
}

impl ActionSender {
    /// Sends an action without blocking.
    ///
    /// Returns `false` if it was dropped.
    #[inline]
    pub fn send(&self, action: EngineAction) -> bool {
        match self.sender.try_send(action) {
            Ok(()) => true,
            Err(TrySendError::Full(action)) => {
                tracing::warn!(actor = %action.actor(), "action channel full, dropping action");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Host-side handle.
#[derive(Clone)]
pub struct ActionReceiver {
    receiver: Receiver<EngineAction>,
}

impl ActionReceiver {
    /// Next action, if any.
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<EngineAction> {
        self.receiver.try_recv().ok()
    }

    /// Every queued action.
    #[must_use]
    pub fn drain(&self) -> Vec<EngineAction> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_drain() {
        let (sender, receiver) = ActionBus::create_pair(8);
        let actor = ActorId::random();

        assert!(sender.send(EngineAction::Reject {
            actor,
            check: "speed",
            at: Timestamp::from_millis(5),
        }));
        assert_eq!(receiver.len(), 1);

        let drained = receiver.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].actor(), actor);
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_full_channel_drops() {
        let (sender, receiver) = ActionBus::create_pair(1);
        let actor = ActorId::random();
        let action = EngineAction::Reject {
            actor,
            check: "speed",
            at: Timestamp::ZERO,
        };

        assert!(sender.send(action.clone()));
        assert!(!sender.send(action));
        assert_eq!(receiver.drain().len(), 1);
    }

    #[test]
    fn test_disconnected_drops() {
        let (sender, receiver) = ActionBus::create_pair(4);
        drop(receiver);
        assert!(!sender.send(EngineAction::Reject {
            actor: ActorId::random(),
            check: "speed",
            at: Timestamp::ZERO,
        }));
    }
}
