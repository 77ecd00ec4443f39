//! Consumption rate check.

use serde::Deserialize;
use vigil_core::config::ensure_nonzero;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag, RollingWindow};
use vigil_shared::{Event, EventKind, EventMask, Timestamp};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "fast_use";

/// `[checks.fast_use]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FastUseConfig {
    /// Consumptions in a chain.
    pub chain: usize,
    /// Largest gap that keeps a chain going.
    pub max_interval_ms: u64,
}

impl Default for FastUseConfig {
    fn default() -> Self {
        Self {
            chain: 3,
            max_interval_ms: 1_500,
        }
    }
}

impl Settings for FastUseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.chain < 2 {
            return Err(ConfigError::invalid("checks.fast_use.chain", "must be at least 2"));
        }
        ensure_nonzero("checks.fast_use.max_interval_ms", self.max_interval_ms)
    }
}

/// Recent consumption times.
#[derive(Debug, Default)]
pub struct FastUseState {
    recent: Option<RollingWindow<Timestamp>>,
}

/// Flags chains of consumptions quicker than eating takes.
#[derive(Clone, Debug, Default)]
pub struct FastUseCheck {
    config: FastUseConfig,
}

impl FastUseCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: FastUseConfig) -> Self {
        Self { config }
    }
}

impl Check for FastUseCheck {
    type State = FastUseState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::ItemConsume])
    }

    fn is_exempt(&self, _event: &Event) -> bool {
        false
    }

    fn evaluate(
        &self,
        state: &mut ActorState<FastUseState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let recent = state
            .data
            .recent
            .get_or_insert_with(|| RollingWindow::new(self.config.chain));
        recent.push(event.at);
        if !recent.is_full() {
            return None;
        }

        let mut gaps = recent.iter().zip(recent.iter().skip(1)).map(|(a, b)| b.millis_since(*a));
        if !gaps.all(|gap| gap <= self.config.max_interval_ms) {
            return None;
        }
        let span = recent
            .back()
            .zip(recent.front())
            .map_or(0, |(last, first)| last.millis_since(*first));
        Some(Flag::new(format!("consumed {} items in {span}ms", recent.len())).rejecting())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use vigil_shared::testing::{consume, ms};
    use vigil_shared::ActorId;

    #[test]
    fn test_third_quick_consumption_flags() {
        let harness = Harness::new(FastUseCheck::default());
        let actor = ActorId::random();
        assert!(harness.feed(&consume(actor, ms(1_000), "apple")).is_none());
        assert!(harness.feed(&consume(actor, ms(2_000), "apple")).is_none());
        let verdict = harness.feed(&consume(actor, ms(3_000), "bread")).unwrap();
        assert!(verdict.reject);
        // The chain slides: the fourth is also too quick.
        assert!(harness.feed(&consume(actor, ms(4_500), "bread")).is_some());
    }

    #[test]
    fn test_vanilla_pace_passes() {
        let harness = Harness::new(FastUseCheck::default());
        let actor = ActorId::random();
        for i in 0..10 {
            assert!(harness.feed(&consume(actor, ms(1_000 + i * 1_610), "apple")).is_none());
        }
    }

    #[test]
    fn test_one_slow_gap_breaks_chain() {
        let harness = Harness::new(FastUseCheck::default());
        let actor = ActorId::random();
        harness.feed(&consume(actor, ms(0), "apple"));
        harness.feed(&consume(actor, ms(2_000), "apple"));
        assert!(harness.feed(&consume(actor, ms(2_100), "apple")).is_none());
    }
}
