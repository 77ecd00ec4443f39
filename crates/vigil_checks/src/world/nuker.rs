//! Mass block breaking check.
//!
//! Counts breaks within arm's reach of the actor over a sliding window.
//! Clearing a volume faster than one pair of hands can is a nuker.

use serde::Deserialize;
use vigil_core::config::{ensure_nonzero, ensure_positive};
use vigil_core::{
    ActorState, Check, CheckContext, CheckId, ConfigError, Flag, RollingWindow, Sample,
};
use vigil_shared::{BlockPos, Event, EventKind, EventMask, EventPayload, Timestamp, Vec3};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "nuker";

/// `[checks.nuker]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NukerConfig {
    /// Breaks farther than this from the feet are not counted.
    pub radius: f64,
    /// Sliding window length.
    pub window_ms: u64,
    /// Most breaks allowed in one window.
    pub max_breaks: usize,
}

impl Default for NukerConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            window_ms: 1_000,
            max_breaks: 5,
        }
    }
}

impl Settings for NukerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.nuker.radius", self.radius)?;
        ensure_nonzero("checks.nuker.window_ms", self.window_ms)?;
        ensure_nonzero("checks.nuker.max_breaks", self.max_breaks as u64)
    }
}

/// Recent nearby breaks.
#[derive(Debug, Default)]
pub struct NukerState {
    breaks: Option<RollingWindow<Sample<BlockPos>>>,
}

/// Break volume check.
#[derive(Clone, Debug, Default)]
pub struct NukerCheck {
    config: NukerConfig,
}

impl NukerCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: NukerConfig) -> Self {
        Self { config }
    }
}

fn broken(event: &Event) -> Option<(BlockPos, Vec3)> {
    match &event.payload {
        EventPayload::BlockBreak {
            block, position, ..
        } => Some((*block, *position)),
        _ => None,
    }
}

impl Check for NukerCheck {
    type State = NukerState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::BlockBreak])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| s.game_mode.is_privileged())
    }

    fn on_exempt(&self, state: &mut ActorState<NukerState>) {
        state.reset_baseline();
    }

    fn has_delta(&self, event: &Event) -> bool {
        let radius_squared = self.config.radius * self.config.radius;
        broken(event)
            .is_some_and(|(block, feet)| feet.distance_squared(block.center()) <= radius_squared)
    }

    fn evaluate(
        &self,
        state: &mut ActorState<NukerState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let (block, _) = broken(event)?;
        // One more than the limit, so exceeding it is observable.
        let breaks = state
            .data
            .breaks
            .get_or_insert_with(|| RollingWindow::new(self.config.max_breaks + 1));
        breaks.push(Sample::new(event.at, block));
        let cutoff = event.at.as_millis().saturating_sub(self.config.window_ms);
        breaks.evict_before(Timestamp::from_millis(cutoff));

        if breaks.len() <= self.config.max_breaks {
            return None;
        }
        let count = breaks.len();
        breaks.clear();
        Some(
            Flag::new(format!(
                "broke {count} blocks within {}ms",
                self.config.window_ms
            ))
            .rejecting(),
        )
    }
}
