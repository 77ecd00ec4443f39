//! Bridging placement check.
//!
//! Only placements that look like bridging qualify: the block sits between
//! 0.9 and 2.5 blocks below the actor's feet with open space above it. A
//! qualifying placement is flagged when it comes too soon after the previous
//! one, when the actor is looking away from the block, or when the view
//! snapped around between two quick placements.

use std::time::Duration;

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{
    angle_between_degrees, Event, EventKind, EventMask, EventPayload, Look, Placement, Timestamp,
    Vec3, BLOCK_TOP_CENTER,
};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "scaffold";

/// Horizontal vectors shorter than this are too degenerate to aim at.
const MIN_AIM_LENGTH_SQUARED: f64 = 0.001;

/// `[checks.scaffold]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScaffoldConfig {
    /// Minimum gap between qualifying placements.
    pub min_interval_ms: u64,
    /// Largest look-to-block angle in degrees.
    pub max_angle: f64,
    /// Largest look-to-block angle in degrees while sprinting.
    pub max_angle_sprinting: f64,
    /// Yaw change in degrees that counts as a snap.
    pub snap_yaw: f32,
    /// Window in which a yaw change counts as a snap.
    pub snap_interval_ms: u64,
    /// Block must be more than this far below the feet.
    pub min_depth: f64,
    /// Block must be less than this far below the feet.
    pub max_depth: f64,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 100,
            max_angle: 135.0,
            max_angle_sprinting: 95.0,
            snap_yaw: 120.0,
            snap_interval_ms: 200,
            min_depth: 0.9,
            max_depth: 2.5,
        }
    }
}

impl Settings for ScaffoldConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.scaffold.max_angle", self.max_angle)?;
        ensure_positive("checks.scaffold.max_angle_sprinting", self.max_angle_sprinting)?;
        ensure_positive("checks.scaffold.snap_yaw", f64::from(self.snap_yaw))?;
        ensure_positive("checks.scaffold.min_depth", self.min_depth)?;
        if self.max_depth <= self.min_depth {
            return Err(ConfigError::invalid(
                "checks.scaffold.max_depth",
                "must be greater than min_depth",
            ));
        }
        Ok(())
    }
}

/// Last qualifying placement.
#[derive(Debug, Default)]
pub struct ScaffoldState {
    last: Option<(Timestamp, Look)>,
}

/// Bridging rate, aim and snap check.
#[derive(Clone, Debug, Default)]
pub struct ScaffoldCheck {
    config: ScaffoldConfig,
}

impl ScaffoldCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: ScaffoldConfig) -> Self {
        Self { config }
    }

    fn qualifies(&self, p: &Placement) -> bool {
        let y = f64::from(p.block.y);
        y < p.feet.y - self.config.min_depth && y > p.feet.y - self.config.max_depth && !p.above_solid
    }

    /// Angle between the look direction and the block's top centre, or
    /// `None` when the block is straight below the eye.
    fn aim_angle(p: &Placement) -> Option<f64> {
        let (x, y, z) = BLOCK_TOP_CENTER;
        let target = p.block.corner() + Vec3::new(x, y, z);
        let to_block = (target - p.eye).flattened();
        if to_block.length_squared() <= MIN_AIM_LENGTH_SQUARED {
            return None;
        }
        let to_block = to_block.normalized()?;
        Some(angle_between_degrees(p.status.look.horizontal_direction(), to_block))
    }
}

fn placement(event: &Event) -> Option<&Placement> {
    match &event.payload {
        EventPayload::BlockPlace(p) => Some(p),
        _ => None,
    }
}

impl Check for ScaffoldCheck {
    type State = ScaffoldState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::BlockPlace])
    }

    fn on_exempt(&self, state: &mut ActorState<ScaffoldState>) {
        state.reset_baseline();
    }

    fn has_delta(&self, event: &Event) -> bool {
        placement(event).is_some_and(|p| self.qualifies(p))
    }

    fn evaluate(
        &self,
        state: &mut ActorState<ScaffoldState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let p = placement(event)?;
        let look = p.status.look;
        let mut reasons = Vec::new();

        let since_last = state
            .data
            .last
            .map(|(at, yaw)| (event.at.since(at), yaw));

        if let Some((interval, _)) = since_last {
            if interval < Duration::from_millis(self.config.min_interval_ms) {
                reasons.push(format!("placed {}ms after the last block", interval.as_millis()));
            }
        }

        let limit = if p.status.is_sprinting() {
            self.config.max_angle_sprinting
        } else {
            self.config.max_angle
        };
        if let Some(angle) = Self::aim_angle(p) {
            if angle > limit {
                reasons.push(format!("looking {angle:.0}\u{b0} away from the block"));
            }
        }

        if let Some((interval, last_look)) = since_last {
            let turned = look.yaw_delta(last_look);
            if turned > self.config.snap_yaw
                && interval < Duration::from_millis(self.config.snap_interval_ms)
            {
                reasons.push(format!("snapped {turned:.0}\u{b0} in {}ms", interval.as_millis()));
            }
        }

        state.data.last = Some((event.at, look));

        if reasons.is_empty() {
            None
        } else {
            Some(Flag::new(reasons.join("; ")).rejecting())
        }
    }
}
