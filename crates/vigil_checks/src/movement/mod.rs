//! Movement detectors.

pub mod anti_void;
pub mod fly;
pub mod high_jump;
pub mod no_web;
pub mod sneak;
pub mod speed;
pub mod sprint;
pub mod step;
pub mod velocity;

pub use anti_void::{AntiVoidCheck, AntiVoidConfig};
pub use fly::{FlyCheck, FlyConfig};
pub use high_jump::{HighJumpCheck, HighJumpConfig};
pub use no_web::{NoWebCheck, NoWebConfig};
pub use sneak::{SneakCheck, SneakConfig};
pub use speed::{SpeedCheck, SpeedConfig};
pub use sprint::{SprintCheck, SprintConfig};
pub use step::{StepCheck, StepConfig};
pub use velocity::{VelocityCheck, VelocityConfig};

use vigil_shared::{ActorStatus, EffectKind};

/// Floor on the combined effect multiplier.
const MIN_EFFECT_MULTIPLIER: f64 = 0.01;

/// Combined speed/slowness multiplier for the actor's active effects.
#[must_use]
pub fn effect_multiplier(status: &ActorStatus) -> f64 {
    let multiplier = status.effects.iter().fold(1.0, |acc, effect| {
        let level = f64::from(effect.amplifier) + 1.0;
        match effect.kind {
            EffectKind::Speed => acc * (1.0 + 0.2 * level),
            EffectKind::Slowness => acc * (1.0 - 0.15 * level),
            _ => acc,
        }
    });
    multiplier.max(MIN_EFFECT_MULTIPLIER)
}
