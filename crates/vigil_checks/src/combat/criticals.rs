//! Fake critical hit check.
//!
//! A critical needs a real fall: airborne, descending, not climbing, not
//! swimming and not mounted. The host flags a hit critical from the client's
//! claim; this check compares the claim with the host's own view.

use serde::Deserialize;
use vigil_core::config::ensure_positive;
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{CombatHit, Event, EventKind, EventMask, EventPayload, MovementMode};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "criticals";

/// `[checks.criticals]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriticalsConfig {
    /// Fall distance a critical requires.
    pub min_fall_distance: f32,
}

impl Default for CriticalsConfig {
    fn default() -> Self {
        Self {
            min_fall_distance: 0.1,
        }
    }
}

impl Settings for CriticalsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.criticals.min_fall_distance", f64::from(self.min_fall_distance))
    }
}

/// Flags critical hits the attacker could not have landed.
#[derive(Clone, Debug, Default)]
pub struct CriticalsCheck {
    config: CriticalsConfig,
}

impl CriticalsCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: CriticalsConfig) -> Self {
        Self { config }
    }

    fn impossible_because(&self, hit: &CombatHit) -> Option<&'static str> {
        if hit.attacker_on_ground {
            Some("on ground")
        } else if hit.attacker_fall_distance < self.config.min_fall_distance {
            Some("not falling")
        } else if hit.attacker_terrain.climbing {
            Some("climbing")
        } else if hit.attacker_terrain.in_liquid {
            Some("in liquid")
        } else if hit.status.movement == MovementMode::Riding {
            Some("riding")
        } else {
            None
        }
    }
}

fn critical(event: &Event) -> Option<&CombatHit> {
    match &event.payload {
        EventPayload::CombatHit(hit) if hit.is_critical => Some(hit),
        _ => None,
    }
}

impl Check for CriticalsCheck {
    type State = ();

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::CombatHit])
    }

    fn is_exempt(&self, _event: &Event) -> bool {
        false
    }

    fn has_delta(&self, event: &Event) -> bool {
        critical(event).is_some()
    }

    fn evaluate(
        &self,
        _state: &mut ActorState<()>,
        event: &Event,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let reason = self.impossible_because(critical(event)?)?;
        Some(Flag::new(format!("critical hit while {reason}")).rejecting())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use vigil_shared::testing::{ms, HitBuilder};
    use vigil_shared::{ActorId, Terrain};

    fn hit() -> HitBuilder {
        HitBuilder::new(ActorId::random(), ActorId::random(), ms(0))
    }

    #[test]
    fn test_real_critical_passes() {
        let harness = Harness::new(CriticalsCheck::default());
        assert!(harness.feed(&hit().critical(false, 0.8).build()).is_none());
        assert!(harness.feed(&hit().build()).is_none());
    }

    #[test]
    fn test_impossible_criticals_flag() {
        let harness = Harness::new(CriticalsCheck::default());
        let grounded = hit().critical(true, 0.8).build();
        let hovering = hit().critical(false, 0.05).build();
        let climbing = hit()
            .critical(false, 0.8)
            .terrain(Terrain {
                climbing: true,
                ..Terrain::default()
            })
            .build();
        let swimming = hit()
            .critical(false, 0.8)
            .terrain(Terrain {
                in_liquid: true,
                ..Terrain::default()
            })
            .build();
        for (event, reason) in [
            (grounded, "on ground"),
            (hovering, "not falling"),
            (climbing, "climbing"),
            (swimming, "in liquid"),
        ] {
            let verdict = harness.feed(&event).unwrap();
            assert!(verdict.reject);
            assert!(verdict.detail.ends_with(reason), "{}", verdict.detail);
        }
    }
}
