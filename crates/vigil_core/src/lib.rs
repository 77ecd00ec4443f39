//! # VIGIL Core Engine
//!
//! Detection framework and escalation pipeline for server-side behavioral
//! anomaly detection.
//!
//! ## Architecture Rules
//!
//! 1. **Detectors never block** - evaluation is a pure function of the event
//!    and the actor's own state; delayed work goes through the [`Scheduler`]
//! 2. **One clock** - all timing uses the host [`vigil_shared::Timestamp`]
//!    carried on each event
//! 3. **Isolate and continue** - malformed input or a faulting detector
//!    yields "no verdict", never an error on the event path
//!
//! ## Example
//!
//! ```rust,ignore
//! use vigil_core::{Engine, EngineConfig};
//!
//! let (engine, actions) = Engine::with_channel(EngineConfig::default(), detectors)?;
//! let outcome = engine.handle(&event);
//! if outcome.rejected() {
//!     // roll the move back
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod actions;
pub mod check;
pub mod config;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod scheduler;
pub mod store;
pub mod violations;
pub mod window;

pub use actions::{ActionBus, ActionReceiver, ActionSender, EngineAction};
pub use check::{Check, CheckContext, CheckId, CheckRunner, Detector, Fired, Flag, Verdict};
pub use config::{
    ActionsConfig, ChecksConfig, EngineConfig, EscalationConfig, LifecycleConfig,
};
pub use engine::{Engine, EngineStats, Outcome};
pub use error::{ConfigError, VigilError, VigilResult};
pub use escalation::{ChannelExecutor, EscalationPolicy, Punishment, PunishmentExecutor};
pub use scheduler::{ScheduledTask, Scheduler, TaskId};
pub use store::{ActorState, ActorStateStore, StateHandle};
pub use violations::{ViolationLedger, ViolationRecord};
pub use window::{RollingWindow, Sample};
