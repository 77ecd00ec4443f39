//! Container looting check.

use serde::Deserialize;
use vigil_core::config::ensure_nonzero;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag, RollingWindow, Sample};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, InventoryActionKind};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "chest_stealer";

/// `[checks.chest_stealer]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChestStealerConfig {
    /// Takes in a burst.
    pub burst: usize,
    /// Largest gap between takes inside a burst.
    pub max_interval_ms: u64,
    /// Items a burst must move in total.
    pub min_items: u32,
}

impl Default for ChestStealerConfig {
    fn default() -> Self {
        Self {
            burst: 4,
            max_interval_ms: 150,
            min_items: 3,
        }
    }
}

impl Settings for ChestStealerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.burst < 2 {
            return Err(ConfigError::invalid("checks.chest_stealer.burst", "must be at least 2"));
        }
        ensure_nonzero("checks.chest_stealer.max_interval_ms", self.max_interval_ms)
    }
}

/// Takes from the currently open container.
#[derive(Debug, Default)]
pub struct ChestStealerState {
    takes: Option<RollingWindow<Sample<u32>>>,
}

/// Flags containers emptied faster than a person can click.
#[derive(Clone, Debug, Default)]
pub struct ChestStealerCheck {
    config: ChestStealerConfig,
}

impl ChestStealerCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: ChestStealerConfig) -> Self {
        Self { config }
    }
}

impl Check for ChestStealerCheck {
    type State = ChestStealerState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::InventoryAction])
    }

    fn is_exempt(&self, _event: &Event) -> bool {
        false
    }

    fn has_delta(&self, event: &Event) -> bool {
        matches!(
            event.payload,
            EventPayload::InventoryAction {
                kind: InventoryActionKind::TakeFromContainer | InventoryActionKind::CloseContainer,
                ..
            }
        )
    }

    fn evaluate(
        &self,
        state: &mut ActorState<ChestStealerState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let EventPayload::InventoryAction {
            kind,
            items_affected,
            ..
        } = &event.payload
        else {
            return None;
        };
        let takes = state
            .data
            .takes
            .get_or_insert_with(|| RollingWindow::new(self.config.burst));

        if *kind == InventoryActionKind::CloseContainer {
            takes.clear();
            return None;
        }

        takes.push(Sample::new(event.at, *items_affected));
        if !takes.is_full() || !takes.intervals().all(|gap| gap <= self.config.max_interval_ms) {
            return None;
        }
        let items = takes
            .iter()
            .fold(0u32, |total, s| total.saturating_add(s.value));
        if items < self.config.min_items {
            return None;
        }
        takes.clear();
        Some(
            Flag::new(format!(
                "took {items} items in {} clicks",
                self.config.burst
            ))
            .rejecting(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use vigil_shared::testing::{inventory, ms};
    use vigil_shared::ActorId;

    const TAKE: InventoryActionKind = InventoryActionKind::TakeFromContainer;

    #[test]
    fn test_fourth_quick_take_flags() {
        let harness = Harness::new(ChestStealerCheck::default());
        let actor = ActorId::random();
        for i in 0..3 {
            assert!(harness.feed(&inventory(actor, ms(1_000 + i * 100), TAKE, 16)).is_none());
        }
        let verdict = harness.feed(&inventory(actor, ms(1_300), TAKE, 16)).unwrap();
        assert!(verdict.reject);
        assert!(verdict.detail.contains("64 items"));
        // Cleared after the flag.
        assert!(harness.feed(&inventory(actor, ms(1_350), TAKE, 16)).is_none());
    }

    #[test]
    fn test_huge_item_counts_saturate() {
        let harness = Harness::new(ChestStealerCheck::default());
        let actor = ActorId::random();
        for i in 0..3 {
            harness.feed(&inventory(actor, ms(1_000 + i * 100), TAKE, u32::MAX / 2));
        }
        let verdict = harness.feed(&inventory(actor, ms(1_300), TAKE, u32::MAX)).unwrap();
        assert!(verdict.detail.contains(&format!("took {} items", u32::MAX)));
    }

    #[test]
    fn test_boundary_interval_counts_as_quick() {
        let harness = Harness::new(ChestStealerCheck::default());
        let actor = ActorId::random();
        for i in 0..3 {
            harness.feed(&inventory(actor, ms(1_000 + i * 150), TAKE, 1));
        }
        assert!(harness.feed(&inventory(actor, ms(1_450), TAKE, 1)).is_some());
    }

    #[test]
    fn test_empty_slots_do_not_count() {
        let harness = Harness::new(ChestStealerCheck::default());
        let actor = ActorId::random();
        for i in 0..8 {
            assert!(harness.feed(&inventory(actor, ms(1_000 + i * 50), TAKE, 0)).is_none());
        }
    }

    #[test]
    fn test_slow_clicks_pass() {
        let harness = Harness::new(ChestStealerCheck::default());
        let actor = ActorId::random();
        for i in 0..8 {
            assert!(harness.feed(&inventory(actor, ms(1_000 + i * 200), TAKE, 64)).is_none());
        }
    }

    #[test]
    fn test_closing_container_resets_burst() {
        let harness = Harness::new(ChestStealerCheck::default());
        let actor = ActorId::random();
        for i in 0..3 {
            harness.feed(&inventory(actor, ms(1_000 + i * 100), TAKE, 16));
        }
        harness.feed(&inventory(actor, ms(1_250), InventoryActionKind::CloseContainer, 0));
        assert!(harness.feed(&inventory(actor, ms(1_300), TAKE, 16)).is_none());
    }
}
