//! Path resolution for userdb.
//!
//! This module resolves the config file, the JSON data file and its lock file
//! to absolute paths. Every command goes through here so that two invocations
//! pointed at the same data file always agree on the lock file path.

use crate::config::Config;
use crate::config::types::DEFAULT_CONFIG_FILE;
use crate::error::{Result, UserDbError};
use std::env;
use std::path::{Path, PathBuf};

/// Suffix appended to the data file name to form its lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// Resolved paths for one userdb data file.
///
/// All paths are absolute.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Absolute path to the config file (which may not exist).
    pub config_path: PathBuf,

    /// Absolute path to the JSON data file.
    pub data_file: PathBuf,

    /// Absolute path to the lock file guarding `data_file`.
    pub lock_path: PathBuf,
}

impl StoreContext {
    /// Resolve the context from the current working directory.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config path, or `None` for `./userdb.yaml`
    /// * `data_file` - Explicit data file path overriding the config's `data_file`
    pub fn resolve(
        config_path: Option<&Path>,
        data_file: Option<&Path>,
        config: &Config,
    ) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            UserDbError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Ok(Self::resolve_from(&cwd, config_path, data_file, config))
    }

    /// Resolve the context relative to a specific directory.
    ///
    /// A data file given explicitly is resolved against `cwd`; one taken from
    /// the config is resolved against the config file's directory.
    pub fn resolve_from<P: AsRef<Path>>(
        cwd: P,
        config_path: Option<&Path>,
        data_file: Option<&Path>,
        config: &Config,
    ) -> Self {
        let cwd = cwd.as_ref();

        let config_path = absolutize(cwd, config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE)));

        let data_file = match data_file {
            Some(path) => absolutize(cwd, path),
            None => {
                let base = config_path.parent().unwrap_or(cwd);
                absolutize(base, Path::new(&config.data_file))
            }
        };

        let lock_path = lock_path_for(&data_file);

        Self {
            config_path,
            data_file,
            lock_path,
        }
    }
}

/// The lock file path for a data file: `<data file>.lock`.
pub fn lock_path_for(data_file: &Path) -> PathBuf {
    let mut name = data_file.as_os_str().to_os_string();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
