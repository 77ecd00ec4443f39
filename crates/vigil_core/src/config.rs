//! # Engine Configuration
//!
//! Loaded once by the host and handed to [`crate::Engine::new`]. Every field
//! has a default, so an empty document is a valid configuration.
//!
//! ```toml
//! [escalation]
//! threshold = 500
//! ban_duration_secs = 86400
//!
//! [lifecycle]
//! teleport_grace_ms = 1500
//! join_grace_ms = 1000
//! idle_eviction_secs = 300
//!
//! [actions]
//! capacity = 1024
//!
//! [checks]
//! disabled = ["auto_clicker"]
//!
//! [checks.speed]
//! tolerance = 1.25
//! ```
//!
//! Per-check tables are kept as raw TOML here and decoded by the check that
//! owns them through [`ChecksConfig::section`].

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ConfigError;

/// Longest grace period accepted.
pub const MAX_GRACE_MS: u64 = 60_000;

/// Root configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Score threshold and sanction.
    pub escalation: EscalationConfig,
    /// Grace periods and eviction.
    pub lifecycle: LifecycleConfig,
    /// Outbound action bus.
    pub actions: ActionsConfig,
    /// Detector selection and per-detector tables.
    pub checks: ChecksConfig,
}

/// `[escalation]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscalationConfig {
    /// Total score at which the actor is punished.
    pub threshold: u32,
    /// Length of the sanction handed to the executor.
    pub ban_duration_secs: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            threshold: 500,
            ban_duration_secs: 24 * 60 * 60,
        }
    }
}

impl EscalationConfig {
    /// Sanction length.
    #[must_use]
    pub const fn ban_duration(&self) -> Duration {
        Duration::from_secs(self.ban_duration_secs)
    }
}

/// `[lifecycle]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Suppression window after a teleport.
    pub teleport_grace_ms: u64,
    /// Suppression window after joining.
    pub join_grace_ms: u64,
    /// Detector state unused for this long is dropped.
    pub idle_eviction_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            teleport_grace_ms: 1_500,
            join_grace_ms: 1_000,
            idle_eviction_secs: 300,
        }
    }
}

impl LifecycleConfig {
    /// Grace after teleport.
    #[must_use]
    pub const fn teleport_grace(&self) -> Duration {
        Duration::from_millis(self.teleport_grace_ms)
    }

    /// Grace after join.
    #[must_use]
    pub const fn join_grace(&self) -> Duration {
        Duration::from_millis(self.join_grace_ms)
    }

    /// Idle eviction age.
    #[must_use]
    pub const fn idle_eviction(&self) -> Duration {
        Duration::from_secs(self.idle_eviction_secs)
    }
}

/// `[actions]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionsConfig {
    /// Bounded capacity of the outbound action channel.
    pub capacity: usize,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// `[checks]`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Ids of detectors that are not registered.
    pub disabled: Vec<String>,
    /// Raw per-check tables, keyed by check id.
    #[serde(flatten)]
    pub sections: BTreeMap<String, toml::Value>,
}

impl ChecksConfig {
    /// True if the check is listed in `disabled`.
    #[must_use]
    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.iter().any(|d| d == id)
    }

    /// Decodes the `[checks.<id>]` table, or the default when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the table does not match `T`.
    pub fn section<T>(&self, id: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.sections.get(id) {
            Some(value) => Ok(value.clone().try_into()?),
            None => Ok(T::default()),
        }
    }

    /// Fails on any table whose key is not in `known`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSection`] for the first stray table.
    pub fn ensure_known(&self, known: &[&str]) -> Result<(), ConfigError> {
        for key in self.sections.keys() {
            if !known.contains(&key.as_str()) {
                return Err(ConfigError::UnknownSection(key.clone()));
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] on malformed input.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks engine-level ranges. Per-check tables are validated by the
    /// checks that decode them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.escalation.threshold == 0 {
            return Err(ConfigError::invalid(
                "escalation.threshold",
                "must be greater than zero",
            ));
        }
        if self.lifecycle.teleport_grace_ms > MAX_GRACE_MS {
            return Err(ConfigError::invalid(
                "lifecycle.teleport_grace_ms",
                format!("must not exceed {MAX_GRACE_MS}"),
            ));
        }
        if self.lifecycle.join_grace_ms > MAX_GRACE_MS {
            return Err(ConfigError::invalid(
                "lifecycle.join_grace_ms",
                format!("must not exceed {MAX_GRACE_MS}"),
            ));
        }
        if self.lifecycle.idle_eviction_secs == 0 {
            return Err(ConfigError::invalid(
                "lifecycle.idle_eviction_secs",
                "must be greater than zero",
            ));
        }
        if self.actions.capacity == 0 {
            return Err(ConfigError::invalid(
                "actions.capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Rejects non-finite or non-positive values.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for `field`.
pub fn ensure_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be a positive finite number"))
    }
}

/// Rejects zero counts and sizes.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for `field`.
pub fn ensure_nonzero(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::invalid(field, "must be greater than zero"))
    } else {
        Ok(())
    }
}
