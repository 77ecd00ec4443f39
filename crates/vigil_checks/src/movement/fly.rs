//! Flight check.
//!
//! Two rules, both for airborne actors with nothing under them:
//!
//! - **Ascent**: rising faster in one tick than any jump or bounce allows.
//! - **Hover**: holding altitude or drifting up tick after tick. Gravity
//!   wins within a few ticks, so a long run of non-falling airborne moves
//!   well after the last ground contact is sustained flight.

use serde::Deserialize;
use vigil_core::config::{ensure_nonzero, ensure_positive};
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{
    EffectKind, Event, EventKind, EventMask, EventPayload, Movement, Surface, Timestamp, Vec3,
    TICK_MS,
};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "fly";

/// `[checks.fly]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlyConfig {
    /// Largest rise in one airborne tick.
    pub max_ascend: f64,
    /// Non-falling ticks that may pass before hovering is judged.
    pub hover_ticks: u32,
    /// A move that drops less than this counts as not falling.
    pub hover_epsilon: f64,
    /// Airtime beyond `hover_ticks` worth of ticks before hovering flags.
    pub airtime_slack_ms: u64,
}

impl Default for FlyConfig {
    fn default() -> Self {
        Self {
            max_ascend: 0.6,
            hover_ticks: 7,
            hover_epsilon: 0.001,
            airtime_slack_ms: 500,
        }
    }
}

impl Settings for FlyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.fly.max_ascend", self.max_ascend)?;
        ensure_positive("checks.fly.hover_epsilon", self.hover_epsilon)?;
        ensure_nonzero("checks.fly.hover_ticks", u64::from(self.hover_ticks))
    }
}

/// Per-actor record. Hover ticks live on the [`ActorState`] counter.
#[derive(Debug, Default)]
pub struct FlyState {
    last_grounded: Option<Timestamp>,
}

/// Sustained flight and impossible ascent check.
#[derive(Clone, Debug, Default)]
pub struct FlyCheck {
    config: FlyConfig,
}

impl FlyCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: FlyConfig) -> Self {
        Self { config }
    }

    fn min_airtime_ms(&self) -> u64 {
        u64::from(self.config.hover_ticks) * TICK_MS + self.config.airtime_slack_ms
    }
}

fn movement(event: &Event) -> Option<&Movement> {
    match &event.payload {
        EventPayload::PositionUpdate(m) => Some(m),
        _ => None,
    }
}

fn is_held_up(m: &Movement) -> bool {
    m.on_ground || m.terrain.in_liquid || m.terrain.climbing
}

impl Check for FlyCheck {
    type State = FlyState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event
            .status()
            .is_some_and(|s| s.is_unbound_by_physics() || s.has_effect(EffectKind::Levitation))
    }

    fn on_exempt(&self, state: &mut ActorState<FlyState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut FlyState, event: &Event) {
        if movement(event).is_some_and(is_held_up) {
            data.last_grounded = Some(event.at);
        }
    }

    fn has_delta(&self, event: &Event) -> bool {
        movement(event).is_some_and(Movement::has_displacement)
    }

    fn evaluate(
        &self,
        state: &mut ActorState<FlyState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let m = movement(event)?;
        if is_held_up(m) {
            state.suspicious_ticks = 0;
            state.data.last_grounded = Some(event.at);
            return None;
        }
        let grounded_at = *state.data.last_grounded.get_or_insert(event.at);

        let rise = m.to.y - m.from.y;
        if rise > self.config.max_ascend && m.terrain.below == Surface::Air {
            state.suspicious_ticks = 0;
            return Some(
                Flag::new(format!("ascended {rise:.2} blocks in one airborne tick")).rejecting(),
            );
        }

        if rise >= -self.config.hover_epsilon && !m.terrain.is_supported() {
            state.suspicious_ticks += 1;
        } else {
            state.suspicious_ticks = 0;
        }

        let airtime = event.at.millis_since(grounded_at);
        if state.suspicious_ticks > self.config.hover_ticks && airtime > self.min_airtime_ms() {
            let ticks = state.suspicious_ticks;
            state.suspicious_ticks = 0;
            return Some(
                Flag::new(format!("hovered for {ticks} ticks, {airtime}ms off the ground"))
                    .rejecting(),
            );
        }
        None
    }

    fn on_teleport(&self, state: &mut ActorState<FlyState>, _to: Vec3) {
        state.reset_baseline();
    }
}
