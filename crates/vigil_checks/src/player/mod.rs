//! Falling, consumption, inventory and rotation detectors.

pub mod chest_stealer;
pub mod derp;
pub mod fast_use;
pub mod inventory_cleaner;
pub mod no_fall;

pub use chest_stealer::{ChestStealerCheck, ChestStealerConfig};
pub use derp::{DerpCheck, DerpConfig};
pub use fast_use::{FastUseCheck, FastUseConfig};
pub use inventory_cleaner::{InventoryCleanerCheck, InventoryCleanerConfig};
pub use no_fall::{NoFallCheck, NoFallConfig};
