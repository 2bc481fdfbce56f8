//! Configuration types and defaults for userdb.
//!
//! This module defines the lock settings block and the default value
//! functions used by the Config struct.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "userdb.yaml";

/// Retry, backoff and staleness settings for the data file lock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    /// Retries after the first failed attempt before giving up.
    #[serde(default = "default_lock_retries")]
    pub retries: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_lock_min_timeout_ms")]
    pub min_timeout_ms: u64,

    /// Upper bound for any single retry delay, in milliseconds.
    #[serde(default = "default_lock_max_timeout_ms")]
    pub max_timeout_ms: u64,

    /// Multiplier applied to the delay after each retry.
    #[serde(default = "default_lock_factor")]
    pub factor: u32,

    /// Age in milliseconds after which a held lock is considered abandoned.
    #[serde(default = "default_lock_stale_ms")]
    pub stale_ms: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            retries: default_lock_retries(),
            min_timeout_ms: default_lock_min_timeout_ms(),
            max_timeout_ms: default_lock_max_timeout_ms(),
            factor: default_lock_factor(),
            stale_ms: default_lock_stale_ms(),
        }
    }
}

impl LockSettings {
    /// Delay before retry number `attempt` (zero-based).
    ///
    /// Grows geometrically from `min_timeout_ms` and never exceeds
    /// `max_timeout_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let growth = (self.factor as u64).saturating_pow(attempt);
        let millis = self
            .min_timeout_ms
            .saturating_mul(growth)
            .min(self.max_timeout_ms);
        Duration::from_millis(millis)
    }

    /// Staleness threshold as a chrono duration, for comparing lock ages.
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.stale_ms.min(i64::MAX as u64) as i64)
    }
}

// Default value functions for serde
pub(crate) fn default_data_file() -> String {
    "users.json".to_string()
}
pub(crate) fn default_lock_retries() -> u32 {
    5
}
pub(crate) fn default_lock_min_timeout_ms() -> u64 {
    50
}
pub(crate) fn default_lock_max_timeout_ms() -> u64 {
    1000
}
pub(crate) fn default_lock_factor() -> u32 {
    2
}
pub(crate) fn default_lock_stale_ms() -> u64 {
    5000
}
