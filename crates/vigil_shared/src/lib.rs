//! # VIGIL Shared
//!
//! Vocabulary shared between the detection engine and its host.
//!
//! ## CRITICAL RULE
//!
//! This crate carries no detection logic. The host adapter depends on it to
//! translate its own callbacks into [`Event`]s; everything that decides
//! lives in `vigil_core` and `vigil_checks`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod events;
pub mod ids;
pub mod math;
pub mod world;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use constants::{ACTOR_HEIGHT, BLOCK_TOP_CENTER, EYE_HEIGHT, TICK_MS, TICK_RATE};
pub use events::{
    CombatHit, DamageCause, Event, EventKind, EventMask, EventPayload, InteractAction,
    InventoryActionKind, Movement, Placement, TeleportCause,
};
pub use ids::{ActorId, Timestamp};
pub use math::{angle_between_degrees, Look, Vec3};
pub use world::{
    ActorStatus, BlockPos, EffectKind, GameMode, Material, MovementMode, StatusEffect, Surface,
    Terrain,
};
