//! Cobweb slowdown check.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{EffectKind, Event, EventKind, EventMask, EventPayload, Movement, Surface};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "no_web";

/// `[checks.no_web]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoWebConfig {
    /// Horizontal blocks per tick an actor can cover inside a web.
    pub max_speed: f64,
}

impl Default for NoWebConfig {
    fn default() -> Self {
        Self { max_speed: 0.04 }
    }
}

impl Settings for NoWebConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.no_web.max_speed", self.max_speed)
    }
}

/// Flags actors crossing cobwebs at full pace or sprinting through them.
#[derive(Clone, Debug, Default)]
pub struct NoWebCheck {
    config: NoWebConfig,
}

impl NoWebCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: NoWebConfig) -> Self {
        Self { config }
    }
}

fn in_web(event: &Event) -> Option<&Movement> {
    match &event.payload {
        EventPayload::PositionUpdate(m) if m.terrain.at_feet == Surface::Cobweb => Some(m),
        _ => None,
    }
}

impl Check for NoWebCheck {
    type State = ();

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate])
    }

    fn is_exempt(&self, event: &Event) -> bool {
        event
            .status()
            .is_some_and(|s| s.is_unbound_by_physics() || s.has_effect(EffectKind::Speed))
    }

    fn has_delta(&self, event: &Event) -> bool {
        in_web(event).is_some_and(Movement::has_displacement)
    }

    fn evaluate(
        &self,
        _state: &mut ActorState<()>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let m = in_web(event)?;
        let speed = m.from.horizontal_distance(m.to);
        if m.status.is_sprinting() {
            return Some(Flag::new("sprinting through a cobweb").rejecting());
        }
        (speed > self.config.max_speed).then(|| {
            Flag::new(format!(
                "moved {speed:.3} blocks in a tick inside a cobweb, allowed {:.3}",
                self.config.max_speed
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
    use vigil_shared::{ActorId, StatusEffect, Terrain, Vec3};

    const WEB: Terrain = Terrain {
        below: Surface::Solid,
        at_feet: Surface::Cobweb,
        low_ceiling: false,
        soul_speed: false,
        climbing: false,
        in_liquid: false,
        near_support: false,
    };

    fn through_web(actor: ActorId, at: u64, step: f64) -> MoveBuilder {
        MoveBuilder::new(actor, ms(at))
            .step_x(Vec3::new(0.0, 64.0, 0.0), step)
            .terrain(WEB)
    }

    #[test]
    fn test_crawling_through_a_web_is_clean() {
        let harness = Harness::new(NoWebCheck::default());
        let actor = ActorId::random();
        assert!(harness.feed(&through_web(actor, 1_000, 0.03).build()).is_none());
    }

    #[test]
    fn test_walking_speed_in_a_web_flags() {
        let harness = Harness::new(NoWebCheck::default());
        let actor = ActorId::random();
        let verdict = harness.feed(&through_web(actor, 1_000, 0.2).build()).unwrap();
        assert!(verdict.reject);
        assert!(verdict.detail.contains("0.200"));
    }

    #[test]
    fn test_sprinting_in_a_web_flags() {
        let harness = Harness::new(NoWebCheck::default());
        let actor = ActorId::random();
        let verdict = harness.feed(&through_web(actor, 1_000, 0.01).sprinting().build()).unwrap();
        assert!(verdict.detail.contains("sprinting"));
    }

    #[test]
    fn test_outside_webs_and_speed_effect_are_ignored() {
        let harness = Harness::new(NoWebCheck::default());
        let actor = ActorId::random();
        let open = MoveBuilder::new(actor, ms(1_000)).step_x(Vec3::ZERO, 0.3).build();
        assert!(harness.feed(&open).is_none());
        let hasted = through_web(actor, 1_050, 0.2).effect(StatusEffect::new(EffectKind::Speed, 0));
        assert!(harness.feed(&hasted.build()).is_none());
    }
}
