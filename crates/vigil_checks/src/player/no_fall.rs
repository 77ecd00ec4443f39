//! Fall damage avoidance check.
//!
//! Two independent rules:
//!
//! - **Fall reset**: the actor plunges faster than free fall allows while the
//!   host-tracked fall distance stays near zero, i.e. the client keeps
//!   claiming it touched ground mid-air.
//! - **Missing damage**: after landing from a damaging height on a surface
//!   that does not absorb falls, fall damage must follow. The check arms a
//!   deferred look a couple of ticks later; a `DamageTaken(Fall)` event
//!   cancels it.

use std::time::Duration;

use serde::Deserialize;
use vigil_core::config::{ensure_nonzero, ensure_positive};
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{DamageCause, EffectKind, Event, EventKind, EventMask, EventPayload, Movement};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "no_fall";

/// `[checks.no_fall]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoFallConfig {
    /// Vertical velocity (blocks per tick) below which the actor is falling fast.
    pub fast_fall_velocity: f64,
    /// Fall distance under which a fast fall is suspicious.
    pub reset_fall_distance: f32,
    /// Consecutive suspicious ticks before flagging.
    pub reset_ticks: u32,
    /// Landing fall distance that must cause damage.
    pub damaging_fall: f32,
    /// Fall distance still reported at the deferred look that confirms the flag.
    pub confirm_fall: f32,
    /// Delay before the deferred look.
    pub confirm_delay_ms: u64,
}

impl Default for NoFallConfig {
    fn default() -> Self {
        Self {
            fast_fall_velocity: -0.65,
            reset_fall_distance: 1.0,
            reset_ticks: 5,
            damaging_fall: 3.75,
            confirm_fall: 3.25,
            confirm_delay_ms: 100,
        }
    }
}

impl Settings for NoFallConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fast_fall_velocity.is_finite() && self.fast_fall_velocity < 0.0) {
            return Err(ConfigError::invalid(
                "checks.no_fall.fast_fall_velocity",
                "must be a negative finite number",
            ));
        }
        ensure_positive("checks.no_fall.reset_fall_distance", f64::from(self.reset_fall_distance))?;
        ensure_nonzero("checks.no_fall.reset_ticks", u64::from(self.reset_ticks))?;
        ensure_positive("checks.no_fall.damaging_fall", f64::from(self.damaging_fall))?;
        ensure_positive("checks.no_fall.confirm_fall", f64::from(self.confirm_fall))?;
        ensure_nonzero("checks.no_fall.confirm_delay_ms", self.confirm_delay_ms)
    }
}

/// Per-actor record. Suspicious fast-fall ticks live on the
/// [`ActorState`] counter.
#[derive(Debug)]
pub struct NoFallState {
    was_on_ground: bool,
    fall_distance: f32,
}

impl Default for NoFallState {
    fn default() -> Self {
        Self {
            was_on_ground: true,
            fall_distance: 0.0,
        }
    }
}

/// Fall reset and missing fall damage check.
#[derive(Clone, Debug, Default)]
pub struct NoFallCheck {
    config: NoFallConfig,
}

impl NoFallCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: NoFallConfig) -> Self {
        Self { config }
    }

    fn on_move(
        &self,
        state: &mut ActorState<NoFallState>,
        m: &Movement,
        cx: &mut CheckContext,
    ) -> Option<Flag> {
        if !m.on_ground && m.velocity.y < self.config.fast_fall_velocity {
            if m.fall_distance < self.config.reset_fall_distance {
                state.suspicious_ticks += 1;
                if state.suspicious_ticks >= self.config.reset_ticks {
                    let ticks = state.suspicious_ticks;
                    state.reset_baseline();
                    cx.cancel_deferred();
                    return Some(
                        Flag::new(format!(
                            "fell at {:.2} blocks/tick for {ticks} ticks with no fall distance",
                            m.velocity.y
                        ))
                        .rejecting(),
                    );
                }
            } else {
                state.suspicious_ticks = 0;
            }
        } else if m.on_ground {
            state.suspicious_ticks = 0;
        }

        if m.on_ground && !state.data.was_on_ground {
            cx.cancel_deferred();
            if m.fall_distance >= self.config.damaging_fall && !m.terrain.below.is_safe_landing() {
                cx.defer(Duration::from_millis(self.config.confirm_delay_ms));
            }
        }

        state.data.was_on_ground = m.on_ground;
        state.data.fall_distance = m.fall_distance;
        None
    }
}

impl Check for NoFallCheck {
    type State = NoFallState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate, EventKind::DamageTaken])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| {
            s.is_unbound_by_physics()
                || s.has_effect(EffectKind::SlowFalling)
                || s.has_effect(EffectKind::Levitation)
        })
    }

    fn on_exempt(&self, state: &mut ActorState<NoFallState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut NoFallState, event: &Event) {
        if let EventPayload::PositionUpdate(m) = &event.payload {
            data.was_on_ground = m.on_ground;
            if m.on_ground {
                data.fall_distance = 0.0;
            }
        }
    }

    fn has_delta(&self, event: &Event) -> bool {
        match &event.payload {
            EventPayload::PositionUpdate(m) => m.has_displacement(),
            _ => true,
        }
    }

    fn evaluate(
        &self,
        state: &mut ActorState<NoFallState>,
        event: &Event,
        cx: &mut CheckContext,
    ) -> Option<Flag> {
        match &event.payload {
            EventPayload::PositionUpdate(m) => self.on_move(state, m, cx),
            EventPayload::DamageTaken {
                cause: DamageCause::Fall,
                ..
            } => {
                cx.cancel_deferred();
                state.suspicious_ticks = 0;
                state.data.fall_distance = 0.0;
                None
            }
            _ => None,
        }
    }

    fn on_deferred(
        &self,
        state: &mut ActorState<NoFallState>,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let fall = state.data.fall_distance;
        (fall >= self.config.confirm_fall)
            .then(|| Flag::new(format!("landed from {fall:.1} blocks without fall damage")))
    }
}
