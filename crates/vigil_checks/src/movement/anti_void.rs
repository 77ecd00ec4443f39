//! Void rescue check.
//!
//! Falling below the world is final: nothing short of a teleport brings the
//! actor back up. On the first void damage the check remembers the actor's
//! height and looks again a while later. An actor that has climbed back
//! above that height on its own is running a void rescue.

use std::time::Duration;

use serde::Deserialize;
use vigil_core::config::{ensure_nonzero, ensure_positive};
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{DamageCause, Event, EventKind, EventMask, EventPayload, Vec3};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "anti_void";

/// `[checks.anti_void]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AntiVoidConfig {
    /// Delay between the first void damage and the look.
    pub confirm_delay_ms: u64,
    /// Height above the damage point that counts as climbing back.
    pub min_rise: f64,
}

impl Default for AntiVoidConfig {
    fn default() -> Self {
        Self {
            confirm_delay_ms: 2_000,
            min_rise: 0.5,
        }
    }
}

impl Settings for AntiVoidConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("checks.anti_void.confirm_delay_ms", self.confirm_delay_ms)?;
        ensure_positive("checks.anti_void.min_rise", self.min_rise)
    }
}

/// Per-actor record.
#[derive(Debug, Default)]
pub struct AntiVoidState {
    last_y: Option<f64>,
    /// Height at the first void damage, while a look is pending.
    fell_at: Option<f64>,
}

/// Recovery after void damage.
#[derive(Clone, Debug, Default)]
pub struct AntiVoidCheck {
    config: AntiVoidConfig,
}

impl AntiVoidCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: AntiVoidConfig) -> Self {
        Self { config }
    }
}

impl Check for AntiVoidCheck {
    type State = AntiVoidState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate, EventKind::DamageTaken])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| s.game_mode.is_privileged())
    }

    fn on_exempt(&self, state: &mut ActorState<AntiVoidState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut AntiVoidState, event: &Event) {
        if let EventPayload::PositionUpdate(m) = &event.payload {
            data.last_y = Some(m.to.y);
        }
    }

    fn evaluate(
        &self,
        state: &mut ActorState<AntiVoidState>,
        event: &Event,
        cx: &mut CheckContext,
    ) -> Option<Flag> {
        match &event.payload {
            EventPayload::PositionUpdate(m) => state.data.last_y = Some(m.to.y),
            EventPayload::DamageTaken {
                cause: DamageCause::Void,
                ..
            } if state.data.fell_at.is_none() => {
                if let Some(y) = state.data.last_y {
                    state.data.fell_at = Some(y);
                    cx.defer(Duration::from_millis(self.config.confirm_delay_ms));
                }
            }
            _ => {}
        }
        None
    }

    fn on_deferred(
        &self,
        state: &mut ActorState<AntiVoidState>,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let fell_at = state.data.fell_at.take()?;
        let now = state.data.last_y?;
        (now > fell_at + self.config.min_rise).then(|| {
            Flag::new(format!(
                "climbed from y {fell_at:.1} back to {now:.1} after void damage"
            ))
        })
    }

    fn on_teleport(&self, state: &mut ActorState<AntiVoidState>, to: Vec3) {
        state.reset_baseline();
        state.data.last_y = Some(to.y);
    }
}
