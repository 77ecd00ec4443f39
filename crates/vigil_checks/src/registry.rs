//! Explicit detector registry.
//!
//! There is no discovery: a detector exists for the engine only if it is
//! listed here.

use serde::de::DeserializeOwned;
use vigil_core::{CheckId, CheckRunner, ConfigError, Detector, EngineConfig};

use crate::combat::{auto_clicker, criticals, killaura, reach};
use crate::movement::{anti_void, fly, high_jump, no_web, sneak, speed, sprint, step, velocity};
use crate::player::{chest_stealer, derp, fast_use, inventory_cleaner, no_fall};
use crate::world::{fast_break, fast_place, nuker, scaffold};

/// Ids of every detector in the catalog, in registration order.
pub const CHECK_IDS: [CheckId; 22] = [
    speed::ID,
    scaffold::ID,
    fast_place::ID,
    fast_break::ID,
    no_fall::ID,
    reach::ID,
    criticals::ID,
    auto_clicker::ID,
    fast_use::ID,
    inventory_cleaner::ID,
    chest_stealer::ID,
    high_jump::ID,
    fly::ID,
    step::ID,
    no_web::ID,
    sneak::ID,
    sprint::ID,
    velocity::ID,
    anti_void::ID,
    nuker::ID,
    killaura::ID,
    derp::ID,
];

/// A detector's `[checks.<id>]` table.
pub trait Settings: DeserializeOwned + Default {
    /// Range checks, run once at construction.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    fn validate(&self) -> Result<(), ConfigError>;
}

fn settings<S: Settings>(config: &EngineConfig, id: CheckId) -> Result<S, ConfigError> {
    let section: S = config.checks.section(id)?;
    section.validate()?;
    Ok(section)
}

/// Builds every detector from `config`.
///
/// Disabled detectors are still built here; the engine drops them when it
/// registers the list.
///
/// # Errors
///
/// Fails on a `[checks.*]` table that names no detector, a table that does
/// not decode, or a value out of range.
pub fn default_checks(config: &EngineConfig) -> Result<Vec<Box<dyn Detector>>, ConfigError> {
    config.checks.ensure_known(&CHECK_IDS)?;

    let detectors = vec![
        CheckRunner::boxed(speed::SpeedCheck::new(settings(config, speed::ID)?)),
        CheckRunner::boxed(scaffold::ScaffoldCheck::new(settings(config, scaffold::ID)?)),
        CheckRunner::boxed(fast_place::FastPlaceCheck::new(settings(config, fast_place::ID)?)),
        CheckRunner::boxed(fast_break::FastBreakCheck::new(settings(config, fast_break::ID)?)),
        CheckRunner::boxed(no_fall::NoFallCheck::new(settings(config, no_fall::ID)?)),
        CheckRunner::boxed(reach::ReachCheck::new(settings(config, reach::ID)?)),
        CheckRunner::boxed(criticals::CriticalsCheck::new(settings(config, criticals::ID)?)),
        CheckRunner::boxed(auto_clicker::AutoClickerCheck::new(settings(config, auto_clicker::ID)?)),
        CheckRunner::boxed(fast_use::FastUseCheck::new(settings(config, fast_use::ID)?)),
        CheckRunner::boxed(inventory_cleaner::InventoryCleanerCheck::new(settings(
            config,
            inventory_cleaner::ID,
        )?)),
        CheckRunner::boxed(chest_stealer::ChestStealerCheck::new(settings(
            config,
            chest_stealer::ID,
        )?)),
        CheckRunner::boxed(high_jump::HighJumpCheck::new(settings(config, high_jump::ID)?)),
        CheckRunner::boxed(fly::FlyCheck::new(settings(config, fly::ID)?)),
        CheckRunner::boxed(step::StepCheck::new(settings(config, step::ID)?)),
        CheckRunner::boxed(no_web::NoWebCheck::new(settings(config, no_web::ID)?)),
        CheckRunner::boxed(sneak::SneakCheck::new(settings(config, sneak::ID)?)),
        CheckRunner::boxed(sprint::SprintCheck::new(settings(config, sprint::ID)?)),
        CheckRunner::boxed(velocity::VelocityCheck::new(settings(config, velocity::ID)?)),
        CheckRunner::boxed(anti_void::AntiVoidCheck::new(settings(config, anti_void::ID)?)),
        CheckRunner::boxed(nuker::NukerCheck::new(settings(config, nuker::ID)?)),
        CheckRunner::boxed(killaura::KillauraCheck::new(settings(config, killaura::ID)?)),
        CheckRunner::boxed(derp::DerpCheck::new(settings(config, derp::ID)?)),
    ];
    tracing::debug!(count = detectors.len(), "detector catalog built");
    Ok(detectors)
}
