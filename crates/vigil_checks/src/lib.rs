//! # VIGIL Checks
//!
//! The detector catalog. Every detector is a [`vigil_core::Check`]; the
//! engine never sees them directly, only through the boxed runners built by
//! [`registry::default_checks`].
//!
//! ## Catalog
//!
//! | id | watches |
//! |---|---|
//! | `speed` | horizontal distance per tick over a 20-tick window |
//! | `scaffold` | rate, aim and snap of placements under the feet |
//! | `fast_place` | interval between any two placements |
//! | `fast_break` | break interval per material |
//! | `no_fall` | fall damage avoidance |
//! | `reach` | melee distance |
//! | `criticals` | critical hits without a real fall |
//! | `auto_clicker` | click rate and click regularity |
//! | `fast_use` | consumption rate |
//! | `inventory_cleaner` | drops with no screen open |
//! | `chest_stealer` | container takes |
//! | `high_jump` | rise above the last ground against the jump apex |
//! | `fly` | airborne ascent and sustained hovering |
//! | `step` | tall rises straight off the ground |
//! | `no_web` | speed inside cobwebs |
//! | `sneak` | speed while crouched |
//! | `sprint` | sprinting away from the facing direction |
//! | `velocity` | standing still after a hit |
//! | `anti_void` | climbing back out of the void |
//! | `nuker` | nearby breaks per second |
//! | `killaura` | hits outside the line of sight |
//! | `derp` | violent rotations per update |
//!
//! ## Adding a detector
//!
//! Implement the check in its group module, give it a `[checks.<id>]`
//! config struct implementing [`registry::Settings`], then list it in
//! [`registry::CHECK_IDS`] and [`registry::default_checks`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod combat;
pub mod movement;
pub mod player;
pub mod registry;
pub mod world;

pub use registry::{default_checks, Settings, CHECK_IDS};
