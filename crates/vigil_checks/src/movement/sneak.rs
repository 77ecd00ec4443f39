//! Sneak speed check.
//!
//! Once an actor has been crouching for a moment, the crouch slowdown
//! applies in full. Covering walking distance while crouched means the
//! client is skipping the slowdown.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{Event, EventKind, EventMask, EventPayload, Movement, MovementMode, Timestamp};

use super::effect_multiplier;
use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "sneak";

/// `[checks.sneak]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SneakConfig {
    /// Crouch time before the speed cap applies.
    pub settle_ms: u64,
    /// Horizontal blocks per tick while crouched, before effects.
    pub max_speed: f64,
}

impl Default for SneakConfig {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            max_speed: 0.20,
        }
    }
}

impl Settings for SneakConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.sneak.max_speed", self.max_speed)
    }
}

/// Per-actor record.
#[derive(Debug, Default)]
pub struct SneakState {
    sneaking_since: Option<Timestamp>,
}

/// Flags crouched actors moving at walking pace.
#[derive(Clone, Debug, Default)]
pub struct SneakCheck {
    config: SneakConfig,
}

impl SneakCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: SneakConfig) -> Self {
        Self { config }
    }
}

fn movement(event: &Event) -> Option<&Movement> {
    match &event.payload {
        EventPayload::PositionUpdate(m) => Some(m),
        _ => None,
    }
}

fn note_posture(data: &mut SneakState, m: &Movement, at: Timestamp) -> Option<Timestamp> {
    if m.status.movement == MovementMode::Sneaking {
        Some(*data.sneaking_since.get_or_insert(at))
    } else {
        data.sneaking_since = None;
        None
    }
}

impl Check for SneakCheck {
    type State = SneakState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate])
    }

    fn on_exempt(&self, state: &mut ActorState<SneakState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut SneakState, event: &Event) {
        if let Some(m) = movement(event) {
            note_posture(data, m, event.at);
        }
    }

    fn evaluate(
        &self,
        state: &mut ActorState<SneakState>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let m = movement(event)?;
        let since = note_posture(&mut state.data, m, event.at)?;
        if event.at.millis_since(since) < self.config.settle_ms || !m.has_displacement() {
            return None;
        }
        let speed = m.from.horizontal_distance(m.to);
        let allowed = self.config.max_speed * effect_multiplier(&m.status);
        (speed > allowed).then(|| {
            Flag::new(format!(
                "moved {speed:.2} blocks in a tick while sneaking, allowed {allowed:.2}"
            ))
            .rejecting()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use vigil_shared::testing::{ms, MoveBuilder};
    use vigil_shared::{ActorId, Vec3};

    fn crouched(actor: ActorId, at: u64, step: f64) -> Event {
        MoveBuilder::new(actor, ms(at))
            .step_x(Vec3::new(0.0, 64.0, 0.0), step)
            .mode(MovementMode::Sneaking)
            .build()
    }

    #[test]
    fn test_fast_sneak_flags_after_settling() {
        let harness = Harness::new(SneakCheck::default());
        let actor = ActorId::random();
        // Still inside the settle time.
        for i in 0..10 {
            assert!(harness.feed(&crouched(actor, 1_000 + i * 50, 0.25)).is_none());
        }
        let verdict = harness.feed(&crouched(actor, 1_500, 0.25)).unwrap();
        assert!(verdict.reject);
    }

    #[test]
    fn test_slow_sneak_is_clean() {
        let harness = Harness::new(SneakCheck::default());
        let actor = ActorId::random();
        for i in 0..40 {
            assert!(harness.feed(&crouched(actor, 1_000 + i * 50, 0.07)).is_none());
        }
    }

    #[test]
    fn test_standing_up_restarts_settle_time() {
        let harness = Harness::new(SneakCheck::default());
        let actor = ActorId::random();
        for i in 0..10 {
            harness.feed(&crouched(actor, 1_000 + i * 50, 0.07));
        }
        let walk = MoveBuilder::new(actor, ms(1_500)).step_x(Vec3::ZERO, 0.2).build();
        assert!(harness.feed(&walk).is_none());
        assert!(harness.feed(&crouched(actor, 1_550, 0.25)).is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(SneakConfig::default().validate().is_ok());
        let bad = SneakConfig {
            max_speed: -1.0,
            ..SneakConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
