//! # Simulation Constants
//!
//! Host cadence and body dimensions the detectors are calibrated against.

/// Host simulation ticks per second.
pub const TICK_RATE: u32 = 20;

/// Nominal tick length in milliseconds.
pub const TICK_MS: u64 = 1_000 / TICK_RATE as u64;

/// Eye height above the feet of a standing actor, in blocks.
pub const EYE_HEIGHT: f64 = 1.62;

/// Offset from a block's integer corner to the centre of its top face.
pub const BLOCK_TOP_CENTER: (f64, f64, f64) = (0.5, 1.0, 0.5);

/// Height of a standing actor's hitbox, in blocks.
pub const ACTOR_HEIGHT: f64 = 1.8;
