//! Jump height check.
//!
//! Remembers the height of the last surface the actor stood on and measures
//! every rising airborne move against it. The allowance is the vanilla jump
//! apex, raised by Jump Boost and by launching off a slime block.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{
    ActorStatus, EffectKind, Event, EventKind, EventMask, EventPayload, Movement, Surface, Vec3,
};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "high_jump";

/// `[checks.high_jump]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighJumpConfig {
    /// Apex of a plain jump above the take-off surface.
    pub base_height: f64,
    /// Apex with Jump Boost, indexed by zero-based amplifier.
    pub jump_boost_heights: Vec<f64>,
    /// Extra apex per amplifier level past the end of `jump_boost_heights`.
    pub jump_boost_step: f64,
    /// Extra apex when taking off from a slime block.
    pub slime_bonus: f64,
    /// Added to every allowance.
    pub tolerance: f64,
    /// Rises at or under this are never judged.
    pub min_rise: f64,
}

impl Default for HighJumpConfig {
    fn default() -> Self {
        Self {
            base_height: 1.26,
            jump_boost_heights: vec![2.50, 4.06, 6.00, 8.20, 10.80],
            jump_boost_step: 2.0,
            slime_bonus: 7.0,
            tolerance: 0.25,
            min_rise: 0.05,
        }
    }
}

impl Settings for HighJumpConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.high_jump.base_height", self.base_height)?;
        ensure_positive("checks.high_jump.jump_boost_step", self.jump_boost_step)?;
        ensure_positive("checks.high_jump.slime_bonus", self.slime_bonus)?;
        ensure_positive("checks.high_jump.min_rise", self.min_rise)?;
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::invalid(
                "checks.high_jump.tolerance",
                "must be zero or positive",
            ));
        }
        if self.jump_boost_heights.is_empty() {
            return Err(ConfigError::invalid(
                "checks.high_jump.jump_boost_heights",
                "must list at least one height",
            ));
        }
        let ascending = self
            .jump_boost_heights
            .windows(2)
            .all(|pair| pair[0] < pair[1]);
        if !ascending || self.jump_boost_heights[0] <= self.base_height {
            return Err(ConfigError::invalid(
                "checks.high_jump.jump_boost_heights",
                "must rise above base_height and keep rising",
            ));
        }
        Ok(())
    }
}

/// Per-actor record.
#[derive(Debug, Default)]
pub struct HighJumpState {
    /// Feet height on the last grounded move.
    ground_y: Option<f64>,
    /// Surface under the feet on that move.
    launched_from: Surface,
}

/// Rise above the last ground versus the jump apex.
#[derive(Clone, Debug, Default)]
pub struct HighJumpCheck {
    config: HighJumpConfig,
}

impl HighJumpCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: HighJumpConfig) -> Self {
        Self { config }
    }

    /// Highest legitimate rise, tolerance included.
    fn allowance(&self, status: &ActorStatus, launched_from: Surface) -> f64 {
        let c = &self.config;
        let boost = status
            .effects
            .iter()
            .filter(|e| e.kind == EffectKind::JumpBoost)
            .map(|e| usize::from(e.amplifier))
            .max();
        let mut height = match boost {
            None => c.base_height,
            Some(level) => c.jump_boost_heights.get(level).copied().unwrap_or_else(|| {
                let last = c.jump_boost_heights.len().saturating_sub(1);
                let top = c.jump_boost_heights.last().copied().unwrap_or(c.base_height);
                top + (level - last) as f64 * c.jump_boost_step
            }),
        };
        if launched_from == Surface::Slime {
            height += c.slime_bonus;
        }
        height + c.tolerance
    }
}

fn movement(event: &Event) -> Option<&Movement> {
    match &event.payload {
        EventPayload::PositionUpdate(m) => Some(m),
        _ => None,
    }
}

/// Grounded, climbing or swimming: any of these is a fresh take-off point.
fn is_footing(m: &Movement) -> bool {
    m.on_ground || m.terrain.climbing || m.terrain.in_liquid
}

impl Check for HighJumpCheck {
    type State = HighJumpState;

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

    fn on_exempt(&self, state: &mut ActorState<HighJumpState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut HighJumpState, event: &Event) {
        if let Some(m) = movement(event).filter(|m| is_footing(m)) {
            data.ground_y = Some(m.to.y);
            data.launched_from = m.terrain.below;
        }
    }

    fn has_delta(&self, event: &Event) -> bool {
        movement(event).is_some_and(Movement::has_displacement)
    }

    fn evaluate(
        &self,
        state: &mut ActorState<HighJumpState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let m = movement(event)?;
        let data = &mut state.data;

        if is_footing(m) {
            data.ground_y = Some(m.to.y);
            data.launched_from = m.terrain.below;
            return None;
        }
        if m.to.y <= m.from.y {
            return None;
        }

        let rise = m.to.y - data.ground_y.unwrap_or(m.from.y);
        if rise <= self.config.min_rise {
            return None;
        }
        let allowed = self.allowance(&m.status, data.launched_from);
        if rise <= allowed {
            return None;
        }

        data.ground_y = None;
        Some(
            Flag::new(format!(
                "rose {rise:.2} blocks above the last ground, allowed {allowed:.2}"
            ))
            .rejecting(),
        )
    }

    fn on_teleport(&self, state: &mut ActorState<HighJumpState>, to: Vec3) {
        state.reset_baseline();
        state.data.ground_y = Some(to.y);
    }
}
