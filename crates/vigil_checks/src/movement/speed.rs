//! Kinematic speed check.
//!
//! Keeps two rolling sums over the last N position updates: horizontal
//! distance actually covered, and the most the actor could legitimately have
//! covered on each of those ticks given its mode, surface and effects. The
//! actor is flagged once the window is full and the actual sum exceeds the
//! allowed sum times a tolerance. Summing over a window instead of judging
//! single ticks absorbs network jitter and lag bursts.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{
    ActorState, Check, CheckContext, CheckId, ConfigError, Flag, RollingWindow,
};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, Movement, Surface, Vec3};

use super::effect_multiplier;
use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "speed";

/// `[checks.speed]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedConfig {
    /// Ticks per window.
    pub window: usize,
    /// Allowed overshoot factor.
    pub tolerance: f64,
    /// Blocks per tick walking on ground.
    pub ground_walk: f64,
    /// Blocks per tick sprinting on ground.
    pub ground_sprint: f64,
    /// Blocks per tick walking airborne.
    pub air_walk: f64,
    /// Blocks per tick sprinting airborne.
    pub air_sprint: f64,
    /// Extra allowance on the tick the actor leaves the ground.
    pub jump_bonus: f64,
    /// Multiplier on ice.
    pub ice_multiplier: f64,
    /// Multiplier on soul sand without soul speed.
    pub soul_sand_multiplier: f64,
    /// Multiplier on or against honey.
    pub honey_multiplier: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            window: 20,
            tolerance: 1.2,
            ground_walk: 0.23,
            ground_sprint: 0.30,
            air_walk: 0.24,
            air_sprint: 0.31,
            jump_bonus: 0.03,
            ice_multiplier: 1.4,
            soul_sand_multiplier: 0.4,
            honey_multiplier: 0.4,
        }
    }
}

impl Settings for SpeedConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::invalid("checks.speed.window", "must be greater than zero"));
        }
        for (field, value) in [
            ("checks.speed.tolerance", self.tolerance),
            ("checks.speed.ground_walk", self.ground_walk),
            ("checks.speed.ground_sprint", self.ground_sprint),
            ("checks.speed.air_walk", self.air_walk),
            ("checks.speed.air_sprint", self.air_sprint),
            ("checks.speed.ice_multiplier", self.ice_multiplier),
            ("checks.speed.soul_sand_multiplier", self.soul_sand_multiplier),
            ("checks.speed.honey_multiplier", self.honey_multiplier),
        ] {
            ensure_positive(field, value)?;
        }
        if !self.jump_bonus.is_finite() || self.jump_bonus < 0.0 {
            return Err(ConfigError::invalid("checks.speed.jump_bonus", "must be zero or positive"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct Tick {
    actual: f64,
    allowed: f64,
}

/// Per-actor record.
#[derive(Debug)]
pub struct SpeedState {
    window: Option<RollingWindow<Tick>>,
    last_position: Option<Vec3>,
    was_on_ground: bool,
}

impl Default for SpeedState {
    fn default() -> Self {
        Self {
            window: None,
            last_position: None,
            was_on_ground: true,
        }
    }
}

/// Windowed horizontal speed cap.
#[derive(Clone, Debug, Default)]
pub struct SpeedCheck {
    config: SpeedConfig,
}

impl SpeedCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: SpeedConfig) -> Self {
        Self { config }
    }

    /// Theoretical maximum horizontal distance for this tick.
    fn allowance(&self, m: &Movement, jumped: bool) -> f64 {
        let c = &self.config;
        let ground = if m.status.is_sprinting() {
            c.ground_sprint
        } else {
            c.ground_walk
        };

        let mut base = if m.on_ground {
            ground
        } else if jumped {
            let with_bonus = ground + c.jump_bonus;
            if m.terrain.low_ceiling {
                with_bonus.max(c.ground_sprint + c.jump_bonus)
            } else {
                with_bonus
            }
        } else if m.status.is_sprinting() {
            c.air_sprint
        } else {
            c.air_walk
        };

        if m.on_ground {
            match m.terrain.below {
                Surface::Ice => base *= c.ice_multiplier,
                Surface::SoulSand if !m.terrain.soul_speed => base *= c.soul_sand_multiplier,
                Surface::Honey => base *= c.honey_multiplier,
                _ => {}
            }
        } else if m.terrain.at_feet == Surface::Honey {
            base *= c.honey_multiplier;
        }

        base * effect_multiplier(&m.status)
    }
}

fn movement(event: &Event) -> Option<&Movement> {
    match &event.payload {
        EventPayload::PositionUpdate(m) => Some(m),
        _ => None,
    }
}

impl Check for SpeedCheck {
    type State = SpeedState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate])
    }

    fn on_exempt(&self, state: &mut ActorState<SpeedState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut SpeedState, event: &Event) {
        if let Some(m) = movement(event) {
            data.last_position = Some(m.to);
            data.was_on_ground = m.on_ground;
        }
    }

    fn has_delta(&self, event: &Event) -> bool {
        movement(event).is_some_and(Movement::has_displacement)
    }

    fn evaluate(
        &self,
        state: &mut ActorState<SpeedState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let m = movement(event)?;
        let data = &mut state.data;

        let origin = data.last_position.unwrap_or(m.from);
        let actual = origin.horizontal_distance(m.to);
        let jumped = !m.on_ground && data.was_on_ground && m.to.y - origin.y > 0.005;
        let allowed = self.allowance(m, jumped);

        let window = data
            .window
            .get_or_insert_with(|| RollingWindow::new(self.config.window));
        window.push(Tick { actual, allowed });

        data.last_position = Some(m.to);
        data.was_on_ground = m.on_ground;

        if !window.is_full() {
            return None;
        }
        let sum_actual: f64 = window.iter().map(|t| t.actual).sum();
        let sum_allowed: f64 = window.iter().map(|t| t.allowed).sum();
        if sum_actual <= sum_allowed * self.config.tolerance {
            return None;
        }

        // The host rolls the actor back to where this move started.
        data.last_position = Some(m.from);
        Some(
            Flag::new(format!(
                "moved {sum_actual:.2} blocks in {} ticks, allowed {:.2}",
                window.len(),
                sum_allowed * self.config.tolerance
            ))
            .rejecting(),
        )
    }

    fn on_teleport(&self, state: &mut ActorState<SpeedState>, to: Vec3) {
        state.reset_baseline();
        state.data.last_position = Some(to);
    }
}
