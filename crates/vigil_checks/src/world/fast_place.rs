//! Placement cooldown check.

use std::time::Duration;

use serde::Deserialize;
use vigil_core::config::ensure_nonzero;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{Event, EventKind, EventMask, Timestamp};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "fast_place";

/// `[checks.fast_place]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FastPlaceConfig {
    /// Minimum gap between any two placements. The vanilla cooldown is 200ms.
    pub min_interval_ms: u64,
}

impl Default for FastPlaceConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 180,
        }
    }
}

impl Settings for FastPlaceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("checks.fast_place.min_interval_ms", self.min_interval_ms)
    }
}

/// Time of the last placement attempt.
#[derive(Debug, Default)]
pub struct FastPlaceState {
    last: Option<Timestamp>,
}

/// Flags placements faster than the cooldown allows.
#[derive(Clone, Debug, Default)]
pub struct FastPlaceCheck {
    config: FastPlaceConfig,
}

impl FastPlaceCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: FastPlaceConfig) -> Self {
        Self { config }
    }
}

impl Check for FastPlaceCheck {
    type State = FastPlaceState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::BlockPlace])
    }

    /// Flight and riding still obey the cooldown.
    fn is_exempt(&self, event: &Event) -> bool {
        event.status().is_some_and(|s| s.game_mode.is_privileged())
    }

    fn evaluate(
        &self,
        state: &mut ActorState<FastPlaceState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        // Rejected attempts still count, so holding the button keeps failing.
        let previous = state.data.last.replace(event.at)?;
        let interval = event.at.since(previous);
        (interval < Duration::from_millis(self.config.min_interval_ms)).then(|| {
            Flag::new(format!("placed {}ms after the last block", interval.as_millis())).rejecting()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use vigil_shared::testing::{ms, PlaceBuilder};
    use vigil_shared::{ActorId, GameMode, MovementMode};

    #[test]
    fn test_first_placement_never_flags() {
        let harness = Harness::new(FastPlaceCheck::default());
        assert!(harness
            .feed(&PlaceBuilder::new(ActorId::random(), ms(0)).build())
            .is_none());
    }

    #[test]
    fn test_cooldown() {
        let harness = Harness::new(FastPlaceCheck::default());
        let actor = ActorId::random();
        assert!(harness.feed(&PlaceBuilder::new(actor, ms(1_000)).build()).is_none());
        assert!(harness.feed(&PlaceBuilder::new(actor, ms(1_200)).build()).is_none());
        let verdict = harness.feed(&PlaceBuilder::new(actor, ms(1_300)).build()).unwrap();
        assert!(verdict.reject);
        // Measured from the rejected attempt, not the last accepted one.
        assert!(harness.feed(&PlaceBuilder::new(actor, ms(1_450)).build()).is_some());
        assert!(harness.feed(&PlaceBuilder::new(actor, ms(1_700)).build()).is_none());
    }

    #[test]
    fn test_exemption_is_game_mode_only() {
        let harness = Harness::new(FastPlaceCheck::default());
        let actor = ActorId::random();
        for i in 0..3 {
            let event = PlaceBuilder::new(actor, ms(1_000 + i * 10))
                .game_mode(GameMode::Creative)
                .build();
            assert!(harness.feed(&event).is_none());
        }

        let flyer = ActorId::random();
        let mut first = PlaceBuilder::new(flyer, ms(1_000)).build();
        let mut second = PlaceBuilder::new(flyer, ms(1_050)).build();
        for event in [&mut first, &mut second] {
            if let vigil_shared::EventPayload::BlockPlace(p) = &mut event.payload {
                p.status.movement = MovementMode::Flying;
            }
        }
        assert!(harness.feed(&first).is_none());
        assert!(harness.feed(&second).is_some());
    }
}
