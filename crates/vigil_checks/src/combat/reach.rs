//! Melee distance check.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, GameMode, MovementMode};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "reach";

/// `[checks.reach]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReachConfig {
    /// Eye-to-victim distance in survival and adventure.
    pub max_distance: f64,
    /// Eye-to-victim distance in creative.
    pub max_distance_creative: f64,
}

impl Default for ReachConfig {
    fn default() -> Self {
        Self {
            max_distance: 3.4,
            max_distance_creative: 5.5,
        }
    }
}

impl Settings for ReachConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.reach.max_distance", self.max_distance)?;
        ensure_positive("checks.reach.max_distance_creative", self.max_distance_creative)
    }
}

/// Flags hits landed from farther than an arm reaches.
#[derive(Clone, Debug, Default)]
pub struct ReachCheck {
    config: ReachConfig,
}

impl ReachCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: ReachConfig) -> Self {
        Self { config }
    }
}

impl Check for ReachCheck {
    type State = ();

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::CombatHit])
    }

    /// Creative attackers are checked against the longer creative reach.
    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| {
            s.game_mode == GameMode::Spectator
                || s.allow_flight
                || matches!(
                    s.movement,
                    MovementMode::Flying | MovementMode::Gliding | MovementMode::Riding
                )
        })
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
        let limit = if hit.status.game_mode == GameMode::Creative {
            self.config.max_distance_creative
        } else {
            self.config.max_distance
        };
        let distance_squared = hit.attacker_eye.distance_squared(hit.victim_position);
        (distance_squared > limit * limit).then(|| {
            Flag::new(format!(
                "hit {} from {:.2} blocks, limit {limit:.1}",
                hit.victim,
                distance_squared.sqrt()
            ))
            .rejecting()
        })
    }
}
