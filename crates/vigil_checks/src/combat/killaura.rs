//! Hit direction check.
//!
//! A melee hit lands on what the attacker is looking at. A hit on a victim
//! far outside the line of sight came from an aura that attacks whatever is
//! in range.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{
    angle_between_degrees, CombatHit, Event, EventKind, EventMask, EventPayload, Vec3,
    ACTOR_HEIGHT,
};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "killaura";

/// `[checks.killaura]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KillauraConfig {
    /// Largest angle in degrees between the look and the victim's centre.
    pub max_angle: f64,
}

impl Default for KillauraConfig {
    fn default() -> Self {
        Self { max_angle: 60.0 }
    }
}

impl Settings for KillauraConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.killaura.max_angle", self.max_angle)
    }
}

/// Flags hits on victims the attacker is not facing.
#[derive(Clone, Debug, Default)]
pub struct KillauraCheck {
    config: KillauraConfig,
}

impl KillauraCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: KillauraConfig) -> Self {
        Self { config }
    }

    /// Angle between the attacker's look and its eye-to-victim line, or
    /// `None` when the two overlap.
    fn off_sight(hit: &CombatHit) -> Option<f64> {
        let centre = hit.victim_position + Vec3::new(0.0, ACTOR_HEIGHT / 2.0, 0.0);
        let to_victim = (centre - hit.attacker_eye).normalized()?;
        Some(angle_between_degrees(hit.status.look.direction(), to_victim))
    }
}

impl Check for KillauraCheck {
    type State = ();

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::CombatHit])
    }

    fn evaluate(
        &self,
        _state: &mut ActorState<()>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let EventPayload::CombatHit(hit) = &event.payload else {
            return None;
        };
        let angle = Self::off_sight(hit)?;
        (angle > self.config.max_angle).then(|| {
            Flag::new(format!("hit a target {angle:.0}\u{b0} off the line of sight")).rejecting()
        })
    }
}
