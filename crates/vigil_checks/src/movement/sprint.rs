//! Omnidirectional sprint check.
//!
//! Sprinting only works forward. A grounded sprint whose direction of travel
//! strays far from the facing direction is sideways or backwards sprinting.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{angle_between_degrees, Event, EventKind, EventMask, EventPayload, Movement};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "sprint";

/// `[checks.sprint]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SprintConfig {
    /// Largest angle in degrees between facing and travel.
    pub max_angle: f64,
    /// Shorter moves carry no usable direction.
    pub min_distance: f64,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            max_angle: 80.0,
            min_distance: 0.05,
        }
    }
}

impl Settings for SprintConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.sprint.max_angle", self.max_angle)?;
        ensure_positive("checks.sprint.min_distance", self.min_distance)
    }
}

/// Flags sprinting in a direction other than forward.
#[derive(Clone, Debug, Default)]
pub struct SprintCheck {
    config: SprintConfig,
}

impl SprintCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: SprintConfig) -> Self {
        Self { config }
    }
}

fn grounded_sprint(event: &Event) -> Option<&Movement> {
    match &event.payload {
        EventPayload::PositionUpdate(m) if m.on_ground && m.status.is_sprinting() => Some(m),
        _ => None,
    }
}

impl Check for SprintCheck {
    type State = ();

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate])
    }

    fn has_delta(&self, event: &Event) -> bool {
        let min_squared = self.config.min_distance * self.config.min_distance;
        grounded_sprint(event)
            .is_some_and(|m| (m.to - m.from).flattened().length_squared() >= min_squared)
    }

    fn evaluate(
        &self,
        _state: &mut ActorState<()>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let m = grounded_sprint(event)?;
        let travel = (m.to - m.from).flattened().normalized()?;
        let angle = angle_between_degrees(m.status.look.horizontal_direction(), travel);
        (angle > self.config.max_angle).then(|| {
            Flag::new(format!("sprinting {angle:.0}\u{b0} away from facing")).rejecting()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use vigil_shared::testing::{ms, MoveBuilder};
    use vigil_shared::{ActorId, Look, MovementMode, Vec3};

    fn sprint_with(actor: ActorId, at: u64, look: Look) -> Event {
        MoveBuilder::new(actor, ms(at))
            .step_x(Vec3::new(0.0, 64.0, 0.0), 0.28)
            .sprinting()
            .look(look)
            .build()
    }

    #[test]
    fn test_forward_sprint_is_clean() {
        let harness = Harness::new(SprintCheck::default());
        let actor = ActorId::random();
        assert!(harness.feed(&sprint_with(actor, 1_000, Look::new(-90.0, 0.0))).is_none());
        // Strafing slightly off forward.
        assert!(harness.feed(&sprint_with(actor, 1_050, Look::new(-45.0, 0.0))).is_none());
    }

    #[test]
    fn test_sideways_and_backwards_sprint_flag() {
        let harness = Harness::new(SprintCheck::default());
        let actor = ActorId::random();
        // Facing +Z while moving +X.
        let verdict = harness.feed(&sprint_with(actor, 1_000, Look::new(0.0, 0.0))).unwrap();
        assert!(verdict.reject);
        assert!(verdict.detail.contains("90"));
        // Facing -X while moving +X.
        assert!(harness.feed(&sprint_with(actor, 1_050, Look::new(90.0, 0.0))).is_some());
    }

    #[test]
    fn test_airborne_walking_and_tiny_moves_are_ignored() {
        let harness = Harness::new(SprintCheck::default());
        let actor = ActorId::random();
        let backwards = Look::new(90.0, 0.0);
        let airborne = MoveBuilder::new(actor, ms(1_000))
            .step_x(Vec3::ZERO, 0.3)
            .sprinting()
            .on_ground(false)
            .look(backwards);
        assert!(harness.feed(&airborne.build()).is_none());
        let walking = MoveBuilder::new(actor, ms(1_050))
            .step_x(Vec3::ZERO, 0.2)
            .mode(MovementMode::Walking)
            .look(backwards);
        assert!(harness.feed(&walking.build()).is_none());
        let nudge = MoveBuilder::new(actor, ms(1_100))
            .step_x(Vec3::ZERO, 0.01)
            .sprinting()
            .look(backwards);
        assert!(harness.feed(&nudge.build()).is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(SprintConfig::default().validate().is_ok());
        let bad = SprintConfig {
            max_angle: 0.0,
            ..SprintConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
