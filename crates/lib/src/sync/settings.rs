//! Tunable registry settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time an unreferenced session is kept before disposal.
pub const DEFAULT_EVICTION_GRACE_MS: u64 = 5_000;

/// Settings for a [`SessionRegistry`](super::SessionRegistry).
///
/// Serializes as JSON so hosts can keep it next to their other settings:
///
/// ```
/// use session_registry::sync::RegistrySettings;
///
/// let settings = RegistrySettings::from_json(r#"{"eviction_grace_ms": 250}"#).unwrap();
/// assert_eq!(settings.grace_period().as_millis(), 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Milliseconds an unreferenced session survives before it is disposed.
    /// Zero disposes as soon as the last handle is released.
    pub eviction_grace_ms: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            eviction_grace_ms: DEFAULT_EVICTION_GRACE_MS,
        }
    }
}

impl RegistrySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.eviction_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.eviction_grace_ms)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
