//! Host ground truth attached to events.
//!
//! The engine does not own world geometry. Whatever a detector needs to know
//! about the surroundings (surface below, ceiling, space above a placed
//! block) is resolved by the host and shipped on the event.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Look, Vec3};

/// Host game mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Normal play.
    #[default]
    Survival,
    /// Normal play with build restrictions.
    Adventure,
    /// Unrestricted building and flight.
    Creative,
    /// Observer / no-clip.
    Spectator,
}

impl GameMode {
    /// Creative or spectator: physical rules do not apply.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Creative | Self::Spectator)
    }
}

/// How the actor is currently moving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Walking.
    #[default]
    Walking,
    /// Sprinting.
    Sprinting,
    /// Sneaking.
    Sneaking,
    /// Flying (creative or sanctioned flight).
    Flying,
    /// Gliding on wings.
    Gliding,
    /// Riding a vehicle or mount.
    Riding,
}

/// Status effect that changes a physical rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Raises movement speed.
    Speed,
    /// Lowers movement speed.
    Slowness,
    /// Raises jump height.
    JumpBoost,
    /// Cancels fall damage.
    SlowFalling,
    /// Lifts the actor.
    Levitation,
    /// Raises dig speed.
    Haste,
}

/// An active status effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect kind.
    pub kind: EffectKind,
    /// Zero-based amplifier (level I is 0).
    pub amplifier: u8,
}

impl StatusEffect {
    /// Creates an effect.
    #[must_use]
    pub const fn new(kind: EffectKind, amplifier: u8) -> Self {
        Self { kind, amplifier }
    }
}

/// Snapshot of the actor's condition when the event happened.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorStatus {
    /// Game mode.
    pub game_mode: GameMode,
    /// Movement mode.
    pub movement: MovementMode,
    /// Host has granted flight (command, plugin, creative).
    pub allow_flight: bool,
    /// Active status effects.
    pub effects: Vec<StatusEffect>,
    /// Look direction.
    pub look: Look,
}

impl ActorStatus {
    /// True while sprinting.
    #[must_use]
    pub fn is_sprinting(&self) -> bool {
        self.movement == MovementMode::Sprinting
    }

    /// True if the actor has the given effect at any level.
    #[must_use]
    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// Observer, sanctioned flight, gliding or riding.
    ///
    /// This is the common exemption used by the movement and placement
    /// detectors; individual detectors may widen or narrow it.
    #[must_use]
    pub fn is_unbound_by_physics(&self) -> bool {
        self.game_mode.is_privileged()
            || self.allow_flight
            || matches!(
                self.movement,
                MovementMode::Flying | MovementMode::Gliding | MovementMode::Riding
            )
    }
}

/// Classification of a block surface, as far as detectors care.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Nothing solid.
    Air,
    /// Any ordinary solid block.
    #[default]
    Solid,
    /// Ice variants (ice, packed, blue, frosted).
    Ice,
    /// Soul sand.
    SoulSand,
    /// Honey block.
    Honey,
    /// Slime block.
    Slime,
    /// Water.
    Water,
    /// Lava.
    Lava,
    /// Cobweb.
    Cobweb,
    /// Hay bale.
    HayBale,
    /// Powder snow.
    PowderSnow,
    /// Any bed.
    Bed,
}

impl Surface {
    /// Landing on this surface cancels or reduces fall damage.
    #[must_use]
    pub const fn is_safe_landing(self) -> bool {
        matches!(
            self,
            Self::Water
                | Self::Lava
                | Self::Cobweb
                | Self::Slime
                | Self::HayBale
                | Self::Honey
                | Self::PowderSnow
                | Self::Bed
        )
    }
}

/// Terrain around a moving actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    /// Block directly below the feet.
    pub below: Surface,
    /// Block occupying the feet.
    pub at_feet: Surface,
    /// An occluding block sits just above the head.
    pub low_ceiling: bool,
    /// Footwear negates the soul sand slowdown.
    pub soul_speed: bool,
    /// Actor is on a ladder or vine.
    pub climbing: bool,
    /// Actor is in water or lava.
    pub in_liquid: bool,
    /// A solid, liquid or cobweb block lies within three blocks under the
    /// feet. Only meaningful when `below` is [`Surface::Air`].
    pub near_support: bool,
}

impl Terrain {
    /// Something under the actor could be holding it up.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.below != Surface::Air || self.near_support
    }
}

/// Integer block coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Creates a block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// World position of the block's minimum corner.
    #[must_use]
    pub fn corner(self) -> Vec3 {
        Vec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// World position of the block's centre.
    #[must_use]
    pub fn center(self) -> Vec3 {
        self.corner() + Vec3::new(0.5, 0.5, 0.5)
    }
}

/// Host material identifier (`"stone"`, `"oak_log"`, `"snowball"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Material(String);

impl Material {
    /// Creates a material id, normalized to lower case.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_ascii_lowercase())
    }

    /// The identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the host's "nothing" material.
    #[must_use]
    pub fn is_air(&self) -> bool {
        self.0.is_empty() || self.0 == "air"
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Material {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
