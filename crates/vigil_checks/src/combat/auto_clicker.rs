//! Click rate and click regularity check.
//!
//! Swings and throwable uses are tracked in separate lanes over a one second
//! window. A lane is flagged for too many clicks in the window, for intervals
//! so even that no hand produced them, or for both at once (severity 2).

use serde::Deserialize;
use vigil_core::config::ensure_nonzero;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag, RollingWindow, Sample};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, InteractAction, Timestamp};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "auto_clicker";

/// `[checks.auto_clicker]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoClickerConfig {
    /// Clicks per window above which the lane is flagged.
    pub max_cps: usize,
    /// Window length.
    pub window_ms: u64,
    /// Intervals needed before regularity is judged.
    pub min_intervals: usize,
    /// Largest deviation from the mean interval that still counts as even.
    pub max_deviation_ms: u64,
    /// Items whose right-click use is tracked.
    pub throwables: Vec<String>,
}

impl Default for AutoClickerConfig {
    fn default() -> Self {
        Self {
            max_cps: 25,
            window_ms: 1_000,
            min_intervals: 10,
            max_deviation_ms: 10,
            throwables: ["snowball", "egg", "ender_pearl"].map(String::from).to_vec(),
        }
    }
}

impl Settings for AutoClickerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("checks.auto_clicker.max_cps", self.max_cps as u64)?;
        ensure_nonzero("checks.auto_clicker.window_ms", self.window_ms)?;
        if self.min_intervals < 2 {
            return Err(ConfigError::invalid(
                "checks.auto_clicker.min_intervals",
                "must be at least 2",
            ));
        }
        Ok(())
    }
}

/// Which lane a click lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lane {
    Swing,
    Throw,
}

/// Per-actor lanes.
#[derive(Debug, Default)]
pub struct AutoClickerState {
    swings: Option<RollingWindow<Sample<()>>>,
    throws: Option<RollingWindow<Sample<()>>>,
}

/// Click rate and regularity check.
#[derive(Clone, Debug, Default)]
pub struct AutoClickerCheck {
    config: AutoClickerConfig,
}

impl AutoClickerCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: AutoClickerConfig) -> Self {
        Self { config }
    }

    fn lane(&self, event: &Event) -> Option<Lane> {
        match &event.payload {
            EventPayload::Interact {
                action: InteractAction::Swing,
                ..
            } => Some(Lane::Swing),
            EventPayload::Interact {
                action: InteractAction::Use { item },
                ..
            } if self.config.throwables.iter().any(|t| t == item.as_str()) => Some(Lane::Throw),
            _ => None,
        }
    }

    /// True when every gap sits within the deviation of the mean gap.
    fn is_metronomic(&self, gaps: &[u64]) -> Option<u64> {
        if gaps.len() < self.config.min_intervals {
            return None;
        }
        let mean = gaps.iter().sum::<u64>() / gaps.len() as u64;
        gaps.iter()
            .all(|gap| gap.abs_diff(mean) <= self.config.max_deviation_ms)
            .then_some(mean)
    }
}

impl Check for AutoClickerCheck {
    type State = AutoClickerState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::Interact])
    }

    fn is_exempt(&self, _event: &Event) -> bool {
        false
    }

    fn has_delta(&self, event: &Event) -> bool {
        self.lane(event).is_some()
    }

    fn evaluate(
        &self,
        state: &mut ActorState<AutoClickerState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let lane = self.lane(event)?;
        let slot = match lane {
            Lane::Swing => &mut state.data.swings,
            Lane::Throw => &mut state.data.throws,
        };
        // One more than the limit, so exceeding it is observable.
        let clicks = slot.get_or_insert_with(|| RollingWindow::new(self.config.max_cps + 1));
        clicks.push(Sample::new(event.at, ()));
        let cutoff = event.at.as_millis().saturating_sub(self.config.window_ms);
        clicks.evict_before(Timestamp::from_millis(cutoff));

        let mut reasons = Vec::new();
        if clicks.len() > self.config.max_cps {
            reasons.push(format!("{} clicks in {}ms", clicks.len(), self.config.window_ms));
        }
        let gaps: Vec<u64> = clicks.intervals().collect();
        if let Some(mean) = self.is_metronomic(&gaps) {
            reasons.push(format!(
                "{} intervals within {}ms of {mean}ms",
                gaps.len(),
                self.config.max_deviation_ms
            ));
        }

        if reasons.is_empty() {
            return None;
        }
        let kind = match lane {
            Lane::Swing => "swing",
            Lane::Throw => "throw",
        };
        let severity = u32::try_from(reasons.len()).unwrap_or(u32::MAX);
        Some(Flag::new(format!("{kind}: {}", reasons.join("; "))).with_severity(severity))
    }
}
