//! Command implementations for userdb.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the environment (config + resolved paths) every
//! command starts from.

mod init;
mod lock;
mod users;

use crate::cli::{Command, GlobalArgs, LockAction};
use crate::config::Config;
use crate::config::types::DEFAULT_CONFIG_FILE;
use crate::context::StoreContext;
use crate::error::{Result, UserDbError};
use crate::record::User;
use crate::store::RecordStore;
use crate::users::UserService;
use serde::Serialize;
use std::path::Path;

/// Config and resolved paths for one invocation.
#[derive(Debug, Clone)]
pub struct Environment {
    pub config: Config,
    pub ctx: StoreContext,
}

impl Environment {
    /// Load the config (defaults if the file is missing) and resolve paths.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config_path = global
            .config
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config = Config::load_or_default(config_path)?;
        let ctx = StoreContext::resolve(global.config.as_deref(), global.data_file.as_deref(), &config)?;
        Ok(Self { config, ctx })
    }

    /// The user service over this environment's data file.
    pub fn user_service(&self) -> UserService {
        UserService::new(RecordStore::<User>::new(&self.ctx, &self.config))
    }
}

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub async fn dispatch(global: GlobalArgs, command: Command) -> Result<()> {
    let env = Environment::load(&global)?;

    match command {
        Command::Init(args) => init::cmd_init(&env, args).await,
        Command::List(args) => users::cmd_list(&env, args).await,
        Command::Show(args) => users::cmd_show(&env, args).await,
        Command::Add(args) => users::cmd_add(&env, args).await,
        Command::Update(args) => users::cmd_update(&env, args).await,
        Command::Delete(args) => users::cmd_delete(&env, args).await,
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::Status => lock::cmd_lock_status(&env).await,
            LockAction::Clear(args) => lock::cmd_lock_clear(&env, args).await,
        },
    }
}

/// Render a value as pretty JSON for stdout.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| UserDbError::StorageError(format!("failed to render JSON: {}", e)))
}
