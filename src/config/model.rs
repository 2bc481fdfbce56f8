//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for userdb.
///
/// This struct represents the contents of `userdb.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Storage settings
    // =========================================================================
    /// Path to the JSON data file. Relative paths are resolved against the
    /// directory holding the config file.
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Treat a malformed data file as an empty collection (logged) instead of
    /// failing the read.
    #[serde(default)]
    pub lenient_reads: bool,

    // =========================================================================
    // Read settings
    // =========================================================================
    /// Limit applied by `list` when none is given on the command line
    /// (0 = no limit).
    #[serde(default)]
    pub default_limit: i64,

    /// Treat a negative limit as "no limit" instead of returning nothing.
    #[serde(default)]
    pub clamp_negative_limit: bool,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Retry/backoff/staleness settings for the data file lock.
    #[serde(default)]
    pub lock: LockSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            lenient_reads: false,
            default_limit: 0,
            clamp_negative_limit: false,
            lock: LockSettings::default(),
        }
    }
}
