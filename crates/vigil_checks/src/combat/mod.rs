//! Combat detectors.

pub mod auto_clicker;
pub mod criticals;
pub mod killaura;
pub mod reach;

pub use auto_clicker::{AutoClickerCheck, AutoClickerConfig};
pub use criticals::{CriticalsCheck, CriticalsConfig};
pub use killaura::{KillauraCheck, KillauraConfig};
pub use reach::{ReachCheck, ReachConfig};
