//! Knockback check.
//!
//! A hit from an entity pushes the victim back. One tick after taking a real
//! hit the actor must have moved; an actor that stays put ignored the
//! knockback.

use std::time::Duration;

use serde::Deserialize;
use vigil_core::config::{ensure_nonzero, ensure_positive};
use vigil_core::{ActorState, Check, CheckContext, CheckId, ConfigError, Flag};
use vigil_shared::{DamageCause, Event, EventKind, EventMask, EventPayload, Vec3, TICK_MS};

use crate::registry::Settings;

/// Check id.
pub const ID: CheckId = "velocity";

/// `[checks.velocity]`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VelocityConfig {
    /// Hits weaker than this carry no knockback worth checking.
    pub min_damage: f32,
    /// Distance the actor must have moved by the look.
    pub min_displacement: f64,
    /// Delay between the hit and the look.
    pub confirm_delay_ms: u64,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            min_damage: 0.1,
            min_displacement: 0.08,
            confirm_delay_ms: TICK_MS,
        }
    }
}

impl Settings for VelocityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("checks.velocity.min_damage", f64::from(self.min_damage))?;
        ensure_positive("checks.velocity.min_displacement", self.min_displacement)?;
        ensure_nonzero("checks.velocity.confirm_delay_ms", self.confirm_delay_ms)
    }
}

/// Per-actor record.
#[derive(Debug, Default)]
pub struct VelocityState {
    position: Option<Vec3>,
    /// Position when the pending hit landed.
    hit_at: Option<Vec3>,
}

/// Ignored knockback check.
#[derive(Clone, Debug, Default)]
pub struct VelocityCheck {
    config: VelocityConfig,
}

impl VelocityCheck {
    /// Creates the check.
    #[must_use]
    pub const fn new(config: VelocityConfig) -> Self {
        Self { config }
    }
}

impl Check for VelocityCheck {
    type State = VelocityState;

    fn id(&self) -> CheckId {
        ID
    }

    fn interests(&self) -> EventMask {
        EventMask::of(&[EventKind::PositionUpdate, EventKind::DamageTaken])
    }

    fn on_exempt(&self, state: &mut ActorState<VelocityState>) {
        state.reset_baseline();
    }

    fn track(&self, data: &mut VelocityState, event: &Event) {
        if let EventPayload::PositionUpdate(m) = &event.payload {
            data.position = Some(m.to);
        }
    }

    fn evaluate(
        &self,
        state: &mut ActorState<VelocityState>,
        event: &Event,
        cx: &mut CheckContext,
    ) -> Option<Flag> {
        match &event.payload {
            EventPayload::PositionUpdate(m) => state.data.position = Some(m.to),
            EventPayload::DamageTaken {
                cause: DamageCause::Entity,
                amount,
            } if *amount >= self.config.min_damage && state.data.hit_at.is_none() => {
                if let Some(position) = state.data.position {
                    state.data.hit_at = Some(position);
                    cx.defer(Duration::from_millis(self.config.confirm_delay_ms));
                }
            }
            _ => {}
        }
        None
    }

    fn on_deferred(
        &self,
        state: &mut ActorState<VelocityState>,
        _cx: &mut CheckContext,
    ) -> Option<Flag> {
        let hit_at = state.data.hit_at.take()?;
        let now = state.data.position?;
        let moved = now.distance_squared(hit_at).sqrt();
        (moved < self.config.min_displacement).then(|| {
            Flag::new(format!(
                "moved {moved:.3} blocks in the {}ms after a hit",
                self.config.confirm_delay_ms
            ))
        })
    }

    fn on_teleport(&self, state: &mut ActorState<VelocityState>, to: Vec3) {
        state.reset_baseline();
        state.data.position = Some(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Harness;
    use vigil_shared::testing::{damage, ms, MoveBuilder};
    use vigil_shared::{ActorId, GameMode};

    fn step(actor: ActorId, at: u64, from: f64, to: f64) -> MoveBuilder {
        MoveBuilder::new(actor, ms(at))
            .between(Vec3::new(from, 64.0, 0.0), Vec3::new(to, 64.0, 0.0))
    }

    #[test]
    fn test_ignored_knockback_flags() {
        let harness = Harness::new(VelocityCheck::default());
        let actor = ActorId::random();
        harness.feed(&step(actor, 1_000, 0.0, 0.1).build());
        assert!(harness.feed(&damage(actor, ms(1_010), DamageCause::Entity, 2.0)).is_none());
        harness.feed(&step(actor, 1_050, 0.1, 0.12).build());

        let verdicts = harness.tick(ms(1_060));
        assert_eq!(verdicts.len(), 1);
        assert!(!verdicts[0].reject);
    }

    #[test]
    fn test_taking_knockback_is_clean() {
        let harness = Harness::new(VelocityCheck::default());
        let actor = ActorId::random();
        harness.feed(&step(actor, 1_000, 0.0, 0.1).build());
        harness.feed(&damage(actor, ms(1_010), DamageCause::Entity, 2.0));
        harness.feed(&step(actor, 1_050, 0.1, -0.3).build());
        assert!(harness.tick(ms(1_060)).is_empty());
    }

    #[test]
    fn test_weak_and_non_entity_damage_arm_nothing() {
        let harness = Harness::new(VelocityCheck::default());
        let actor = ActorId::random();
        harness.feed(&step(actor, 1_000, 0.0, 0.1).build());
        harness.feed(&damage(actor, ms(1_010), DamageCause::Entity, 0.05));
        harness.feed(&damage(actor, ms(1_020), DamageCause::Fall, 3.0));
        assert!(harness.tick(ms(2_000)).is_empty());
    }

    #[test]
    fn test_exempt_actor_clears_pending_look() {
        let harness = Harness::new(VelocityCheck::default());
        let actor = ActorId::random();
        harness.feed(&step(actor, 1_000, 0.0, 0.1).build());
        harness.feed(&damage(actor, ms(1_010), DamageCause::Entity, 2.0));
        harness.feed(&step(actor, 1_030, 0.1, 0.1).game_mode(GameMode::Creative).build());
        assert!(harness.tick(ms(1_060)).is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(VelocityConfig::default().validate().is_ok());
        let bad = VelocityConfig {
            confirm_delay_ms: 0,
            ..VelocityConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
