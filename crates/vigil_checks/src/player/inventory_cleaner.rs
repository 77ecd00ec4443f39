//! Bulk drop check.
//!
//! Dropping items without any screen open is a single-key action; a burst of
//! such drops inside half a second is scripted inventory sorting.

use serde::Deserialize;
use vigil_core::config::ensure_nonzero;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag, RollingWindow, Sample};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, InventoryActionKind, Timestamp};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "inventory_cleaner";

/// `[checks.inventory_cleaner]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryCleanerConfig {
    /// Drops inside the window that trigger a flag.
    pub max_drops: usize,
    /// Window length.
    pub window_ms: u64,
}

impl Default for InventoryCleanerConfig {
    fn default() -> Self {
        Self {
            max_drops: 3,
            window_ms: 500,
        }
    }
}

impl Settings for InventoryCleanerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("checks.inventory_cleaner.max_drops", self.max_drops as u64)?;
        ensure_nonzero("checks.inventory_cleaner.window_ms", self.window_ms)
    }
}

/// Recent drops.
#[derive(Debug, Default)]
pub struct InventoryCleanerState {
    drops: Option<RollingWindow<Sample<()>>>,
}

/// Flags bursts of drops made with no screen open.
#[derive(Clone, Debug, Default)]
pub struct InventoryCleanerCheck {
    config: InventoryCleanerConfig,
}

impl InventoryCleanerCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: InventoryCleanerConfig) -> Self {
        Self { config }
    }
}

impl Check for InventoryCleanerCheck {
    type State = InventoryCleanerState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::InventoryAction])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| s.game_mode.is_privileged())
    }

    fn has_delta(&self, event: &Event) -> bool {
        matches!(
            event.payload,
            EventPayload::InventoryAction {
                kind: InventoryActionKind::Drop { screen_open: false },
                ..
            }
        )
    }

    fn evaluate(
        &self,
        state: &mut ActorState<InventoryCleanerState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let drops = state
            .data
            .drops
            .get_or_insert_with(|| RollingWindow::new(self.config.max_drops));
        drops.push(Sample::new(event.at, ()));
        let cutoff = event.at.as_millis().saturating_sub(self.config.window_ms);
        drops.evict_before(Timestamp::from_millis(cutoff));

        if drops.len() < self.config.max_drops {
            return None;
        }
        let count = drops.len();
        drops.clear();
        Some(
            Flag::new(format!("dropped {count} stacks within {}ms", self.config.window_ms))
                .rejecting(),
        )
    }
}
