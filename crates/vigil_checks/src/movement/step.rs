//! Step height check.
//!
//! A grounded actor walks up at most half a block per tick (slabs, stairs).
//! Anything taller needs a jump, and a jump shows up as upward velocity; a
//! tall rise with no velocity behind it is a step hack.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{EffectKind, Event, EventKind, EventMask, EventPayload, Movement, Surface};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "step";

/// `[checks.step]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepConfig {
    /// Tallest rise in one tick off the ground without jumping.
    pub max_step: f64,
    /// Upward velocity (blocks per tick) at which a rise counts as a jump.
    pub jump_velocity: f64,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            max_step: 0.5,
            jump_velocity: 0.18,
        }
    }
}

impl Settings for StepConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.step.max_step", self.max_step)?;
        ensure_positive("checks.step.jump_velocity", self.jump_velocity)
    }
}

/// Per-actor record.
#[derive(Debug)]
pub struct StepState {
    was_on_ground: bool,
    last_below: Surface,
}

impl Default for StepState {
    fn default() -> Self {
        Self {
            was_on_ground: true,
            last_below: Surface::Solid,
        }
    }
}

/// Flags tall rises straight off the ground.
#[derive(Clone, Debug, Default)]
pub struct StepCheck {
    config: StepConfig,
}

impl StepCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: StepConfig) -> Self {
        Self { config }
    }
}

fn movement(event: &Event) -> Option<&Movement> {
    match &event.payload {
        EventPayload::PositionUpdate(m) => Some(m),
        _ => None,
    }
}

impl Check for StepCheck {
    type State = StepState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| {
            s.is_unbound_by_physics()
                || s.has_effect(EffectKind::Levitation)
                || s.has_effect(EffectKind::JumpBoost)
        })
    }

    fn on_exempt(&self, state: &mut ActorState<StepState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut StepState, event: &Event) {
        if let Some(m) = movement(event) {
            data.was_on_ground = m.on_ground;
            data.last_below = m.terrain.below;
        }
    }

    fn has_delta(&self, event: &Event) -> bool {
        movement(event).is_some_and(Movement::has_displacement)
    }

    fn evaluate(
        &self,
        state: &mut ActorState<StepState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let m = movement(event)?;
        let data = &mut state.data;
        let rise = m.to.y - m.from.y;
        // Slime and honey under the starting block push the actor up on their own.
        let bouncy = matches!(data.last_below, Surface::Slime | Surface::Honey);
        let stepped = data.was_on_ground
            && rise > self.config.max_step
            && m.velocity.y < self.config.jump_velocity
            && !bouncy;

        if stepped {
            state.reset_baseline();
            return Some(
                Flag::new(format!(
                    "stepped up {rise:.2} blocks with vertical velocity {:.2}",
                    m.velocity.y
                ))
                .rejecting(),
            );
        }

        data.was_on_ground = m.on_ground;
        data.last_below = m.terrain.below;
        None
    }
}
