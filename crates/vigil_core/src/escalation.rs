//! # Escalation Policy
//!
//! `Normal -> (total >= threshold) -> Punished -> (reset) -> Normal`
//!
//! The threshold crossing and the score reset happen in one atomic step on
//! the ledger, so each crossing yields exactly one [`Punishment`] however
//! many verdicts race for the same actor. The engine only decides; carrying
//! out the sanction belongs to the host's [`PunishmentExecutor`].

use std::time::Duration;

use vigil_shared::{ActorId, Timestamp};

use crate::actions::{ActionSender, EngineAction};
use crate::check::{CheckId, Verdict};
use crate::config::EscalationConfig;
use crate::violations::{ViolationLedger, ViolationRecord};

/// A decided sanction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Punishment {
    /// Actor to sanction.
    pub actor: ActorId,
    /// Category of the verdict that crossed the threshold.
    pub trigger: CheckId,
    /// Score at the crossing.
    pub score: u32,
    /// Per-category breakdown at the crossing.
    pub record: ViolationRecord,
    /// Requested sanction length.
    pub duration: Duration,
    /// Host time of the crossing.
    pub at: Timestamp,
}

/// Carries out sanctions. Implemented by the host.
pub trait PunishmentExecutor: Send + Sync {
    /// Applies the sanction. Must not block the caller for long.
    fn punish(&self, punishment: &Punishment);
}

/// Forwards punishments onto the action bus.
#[derive(Clone)]
pub struct ChannelExecutor {
    sender: ActionSender,
}

impl ChannelExecutor {
    /// Creates an executor over `sender`.
    #[must_use]
    pub const fn new(sender: ActionSender) -> Self {
        Self { sender }
    }
}

impl PunishmentExecutor for ChannelExecutor {
    fn punish(&self, punishment: &Punishment) {
        if !self.sender.send(EngineAction::Punish(punishment.clone())) {
            tracing::error!(
                actor = %punishment.actor,
                trigger = punishment.trigger,
                "punishment could not be delivered"
            );
        }
    }
}

/// Threshold rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscalationPolicy {
    threshold: u32,
    duration: Duration,
}

impl EscalationPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(threshold: u32, duration: Duration) -> Self {
        Self {
            threshold,
            duration,
        }
    }

    /// Policy from config.
    #[must_use]
    pub const fn from_config(config: &EscalationConfig) -> Self {
        Self::new(config.threshold, config.ban_duration())
    }

    /// Score at which punishment triggers.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Called after `verdict` was recorded. Returns the punishment if this
    /// verdict's actor has reached the threshold; their score is zero
    /// afterwards.
    #[must_use]
    pub fn escalate(&self, ledger: &ViolationLedger, verdict: &Verdict) -> Option<Punishment> {
        let record = ledger.take_if_at_least(verdict.actor, self.threshold)?;
        Some(Punishment {
            actor: verdict.actor,
            trigger: verdict.check,
            score: record.total(),
            record,
            duration: self.duration,
            at: verdict.at,
        })
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from_config(&EscalationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionBus;

    fn verdict(actor: ActorId, severity: u32) -> Verdict {
        Verdict {
            actor,
            check: "scaffold",
            at: Timestamp::from_millis(42),
            severity,
            reject: true,
            detail: String::new(),
        }
    }

    #[test]
    fn test_defaults() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.threshold(), 500);
        assert_eq!(policy.duration, Duration::from_secs(86_400));
    }

    #[test]
    fn test_escalates_exactly_once() {
        let ledger = ViolationLedger::new();
        let policy = EscalationPolicy::new(3, Duration::from_secs(60));
        let actor = ActorId::random();

        let mut punishments = Vec::new();
        for _ in 0..5 {
            let v = verdict(actor, 1);
            ledger.record(&v);
            punishments.extend(policy.escalate(&ledger, &v));
        }

        assert_eq!(punishments.len(), 1);
        let punishment = &punishments[0];
        assert_eq!(punishment.score, 3);
        assert_eq!(punishment.trigger, "scaffold");
        assert_eq!(punishment.record.for_check("scaffold"), 3);
        // Two verdicts after the crossing start a new count.
        assert_eq!(ledger.get(actor).unwrap().total(), 2);
    }

    #[test]
    fn test_overshoot_reports_full_score() {
        let ledger = ViolationLedger::new();
        let policy = EscalationPolicy::new(3, Duration::from_secs(60));
        let actor = ActorId::random();

        let v = verdict(actor, 10);
        ledger.record(&v);
        let punishment = policy.escalate(&ledger, &v).unwrap();
        assert_eq!(punishment.score, 10);
        assert_eq!(ledger.get(actor).unwrap().total(), 0);
    }

    #[test]
    fn test_channel_executor_forwards() {
        let (sender, receiver) = ActionBus::create_pair(4);
        let executor = ChannelExecutor::new(sender);
        let ledger = ViolationLedger::new();
        let policy = EscalationPolicy::new(1, Duration::from_secs(60));
        let actor = ActorId::random();

        let v = verdict(actor, 1);
        ledger.record(&v);
        let punishment = policy.escalate(&ledger, &v).unwrap();
        executor.punish(&punishment);

        assert_eq!(receiver.drain(), vec![EngineAction::Punish(punishment)]);
    }
}
