//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{Result, UserDbError};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(UserDbError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            UserDbError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when the file
    /// does not exist. A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no config at '{}', using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| UserDbError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            UserDbError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `data_file` must be non-empty
    /// - `lock.factor` and `lock.stale_ms` must be positive
    /// - `lock.min_timeout_ms` must not exceed `lock.max_timeout_ms`
    pub fn validate(&self) -> Result<()> {
        if self.data_file.trim().is_empty() {
            return Err(UserDbError::UserError(
                "config validation failed: data_file must not be empty".to_string(),
            ));
        }

        if self.lock.factor == 0 {
            return Err(UserDbError::UserError(
                "config validation failed: lock.factor must be greater than 0".to_string(),
            ));
        }

        if self.lock.stale_ms == 0 {
            return Err(UserDbError::UserError(
                "config validation failed: lock.stale_ms must be greater than 0".to_string(),
            ));
        }

        if self.lock.min_timeout_ms > self.lock.max_timeout_ms {
            return Err(UserDbError::UserError(format!(
                "config validation failed: lock.min_timeout_ms ({}) exceeds lock.max_timeout_ms ({})",
                self.lock.min_timeout_ms, self.lock.max_timeout_ms
            )));
        }

        Ok(())
    }
}
