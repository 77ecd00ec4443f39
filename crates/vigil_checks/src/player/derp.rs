//! Head spin check.
//!
//! Counts violent rotations over the last N position updates. A client that
//! spins or flails its head on most ticks is running a derp module.

use serde::Deserialize;
use vigil_core::config::{ensure_nonzero, ensure_positive};
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag, RollingWindow};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, Look};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "derp";

/// `[checks.derp]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerpConfig {
    /// Yaw change in degrees in one update that counts as violent.
    pub yaw_step: f32,
    /// Pitch change in degrees in one update that counts as violent.
    pub pitch_step: f32,
    /// Updates remembered.
    pub history: usize,
    /// Violent updates within the history that flag.
    pub max_violent: usize,
}

impl Default for DerpConfig {
    fn default() -> Self {
        Self {
            yaw_step: 45.0,
            pitch_step: 30.0,
            history: 20,
            max_violent: 10,
        }
    }
}

impl Settings for DerpConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.derp.yaw_step", f64::from(self.yaw_step))?;
        ensure_positive("checks.derp.pitch_step", f64::from(self.pitch_step))?;
        ensure_nonzero("checks.derp.max_violent", self.max_violent as u64)?;
        if self.max_violent > self.history {
            return Err(ConfigError::invalid(
                "checks.derp.max_violent",
                "must not exceed history",
            ));
        }
        Ok(())
    }
}

/// Per-actor record.
#[derive(Debug, Default)]
pub struct DerpState {
    last_look: Option<Look>,
    violent: Option<RollingWindow<bool>>,
}

/// Rotation violence check.
#[derive(Clone, Debug, Default)]
pub struct DerpCheck {
    config: DerpConfig,
}

impl DerpCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: DerpConfig) -> Self {
        Self { config }
    }

    fn is_violent(&self, look: Look, last: Look) -> bool {
        look.yaw_delta(last) >= self.config.yaw_step
            || (look.pitch - last.pitch).abs() >= self.config.pitch_step
    }
}

fn look(event: &Event) -> Option<Look> {
    match &event.payload {
        EventPayload::PositionUpdate(m) => Some(m.status.look),
        _ => None,
    }
}

impl Check for DerpCheck {
    type State = DerpState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| s.game_mode.is_privileged())
    }

    fn on_exempt(&self, state: &mut ActorState<DerpState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut DerpState, event: &Event) {
        data.last_look = look(event);
    }

    fn evaluate(
        &self,
        state: &mut ActorState<DerpState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let look = look(event)?;
        let data = &mut state.data;
        let Some(last) = data.last_look.replace(look) else {
            return None;
        };
        let violent = self.is_violent(look, last);
        let window = data
            .violent
            .get_or_insert_with(|| RollingWindow::new(self.config.history));
        window.push(violent);

        let count = window.iter().filter(|v| **v).count();
        if count < self.config.max_violent {
            return None;
        }
        window.clear();
        Some(
            Flag::new(format!(
                "{count} violent rotations in the last {} updates",
                self.config.history
            ))
            .rejecting(),
        )
    }
}
