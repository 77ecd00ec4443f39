//! Break speed check.
//!
//! Compares the gap between two consecutive breaks of the same material with
//! the time that material takes to mine by hand with a basic tool. The first
//! break of a material only starts a sequence: the engine never sees when
//! digging began, only when a block came out.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use vigil_core::config::ensure_nonzero;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, Material, Timestamp};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "fast_break";

/// `[checks.fast_break]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FastBreakConfig {
    /// Fraction of the base time an actor may shave off.
    pub tolerance: f64,
    /// Floor on the tolerated interval.
    pub min_interval_ms: u64,
    /// Base time for materials missing from the table.
    pub default_break_ms: u64,
    /// Extra or overriding base times, keyed by material name.
    pub break_times: BTreeMap<String, u64>,
}

impl Default for FastBreakConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.2,
            min_interval_ms: 50,
            default_break_ms: 750,
            break_times: BTreeMap::new(),
        }
    }
}

impl Settings for FastBreakConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && (0.0..1.0).contains(&self.tolerance)) {
            return Err(ConfigError::invalid(
                "checks.fast_break.tolerance",
                "must be in [0, 1)",
            ));
        }
        ensure_nonzero("checks.fast_break.min_interval_ms", self.min_interval_ms)?;
        ensure_nonzero("checks.fast_break.default_break_ms", self.default_break_ms)
    }
}

/// Built-in base break times in milliseconds.
#[must_use]
pub fn base_break_ms(material: &str) -> Option<u64> {
    let ms = match material {
        "stone" | "cobblestone" => 900,
        "dirt" | "glass" => 250,
        "grass_block" | "sand" | "netherrack" => 300,
        "gravel" => 350,
        "sandstone" => 600,
        "obsidian" => 3_000,
        "nether_quartz_ore" | "nether_gold_ore" => 2_250,
        m if m.starts_with("deepslate_") && m.ends_with("_ore") => 3_375,
        m if m.ends_with("_ore") => 2_250,
        m if m.ends_with("_log") || m.ends_with("_stem") => 1_500,
        _ => return None,
    };
    Some(ms)
}

/// Current same-material sequence.
#[derive(Debug, Default)]
pub struct FastBreakState {
    sequence: Option<(Material, Timestamp)>,
}

/// Flags same-material breaks faster than the material allows.
#[derive(Clone, Debug, Default)]
pub struct FastBreakCheck {
    config: FastBreakConfig,
}

impl FastBreakCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: FastBreakConfig) -> Self {
        Self { config }
    }

    /// Shortest acceptable gap between two breaks of `material`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn tolerated(&self, material: &Material) -> Duration {
        let base = self
            .config
            .break_times
            .get(material.as_str())
            .copied()
            .or_else(|| base_break_ms(material.as_str()))
            .unwrap_or(self.config.default_break_ms);
        let scaled = (base as f64 * (1.0 - self.config.tolerance)) as u64;
        Duration::from_millis(scaled.max(self.config.min_interval_ms))
    }
}

impl Check for FastBreakCheck {
    type State = FastBreakState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::BlockBreak])
    }

    /// Haste and efficiency are not exempt; beating the baseline with them
    /// is still beating it.
    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| s.game_mode.is_privileged())
    }

    fn on_exempt(&self, state: &mut ActorState<FastBreakState>) {
        state.reset_baseline();
    }

    fn evaluate(
        &self,
        state: &mut ActorState<FastBreakState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let EventPayload::BlockBreak { material, .. } = &event.payload else {
            return None;
        };

        let last = match &state.data.sequence {
            Some((current, last)) if current == material => *last,
            _ => {
                state.data.sequence = Some((material.clone(), event.at));
                return None;
            }
        };

        let interval = event.at.since(last);
        let tolerated = self.tolerated(material);
        if interval < tolerated {
            state.data.sequence = None;
            return Some(
                Flag::new(format!(
                    "broke {material} in {}ms, expected at least {}ms",
                    interval.as_millis(),
                    tolerated.as_millis()
                ))
                .rejecting(),
            );
        }
        state.data.sequence = Some((material.clone(), event.at));
        None
    }
}
