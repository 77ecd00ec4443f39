//! # VIGIL
//!
//! Server-side behavioral anomaly detection for multiplayer game servers.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  Event   ┌──────────────────────────────────────────┐
//! │    Host    │─────────>│                 Engine                   │
//! │  adapter   │          │                                          │
//! │            │          │  route ──> CheckRunner (per detector)    │
//! │            │          │              │ gate: exempt/grace/delta  │
//! │            │          │              ▼                           │
//! │            │          │            Verdict ──> ViolationLedger   │
//! │            │          │                            │             │
//! │            │          │                  EscalationPolicy        │
//! │            │          └────────────────────────────┬─────────────┘
//! │            │<──── EngineAction (Alert/Reject/Punish)┘
//! └────────────┘
//! ```
//!
//! ## Crates
//!
//! - [`shared`]: events, ids, the host clock
//! - [`core`]: framework, ledger, escalation, config
//! - [`checks`]: the detector catalog
//!
//! ## Example
//!
//! ```rust,ignore
//! let (engine, actions) = vigil::build_engine(vigil::EngineConfig::default())?;
//! let outcome = engine.handle(&event);
//! engine.tick(now);
//! for action in actions.drain() { /* notify, roll back, ban */ }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod admin;

pub use vigil_checks as checks;
pub use vigil_core as core;
pub use vigil_shared as shared;

pub use admin::{AdminCommand, AdminError};
pub use vigil_core::{
    ActionReceiver, Engine, EngineAction, EngineConfig, EngineStats, Outcome, Punishment,
    PunishmentExecutor, Verdict, VigilError, VigilResult,
};

/// Builds an engine with the full detector catalog, configured from
/// `config`, with punishments delivered on the returned receiver.
///
/// # Errors
///
/// Fails on any configuration problem: engine ranges, an unknown or
/// malformed `[checks.*]` table, or a disabled id that names no detector.
pub fn build_engine(config: EngineConfig) -> VigilResult<(Engine, ActionReceiver)> {
    let detectors = vigil_checks::default_checks(&config)?;
    Engine::with_channel(config, detectors)
}

/// Like [`build_engine`] with a host-supplied executor and action sender.
///
/// # Errors
///
/// Same as [`build_engine`].
pub fn build_engine_with(
    config: EngineConfig,
    executor: Box<dyn PunishmentExecutor>,
    actions: vigil_core::ActionSender,
) -> VigilResult<Engine> {
    let detectors = vigil_checks::default_checks(&config)?;
    Engine::new(config, detectors, executor, actions)
}
