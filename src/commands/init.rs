//! Implementation of the `userdb init` command.
//!
//! Writes a config file with every default spelled out and creates an empty
//! data file. Existing data is never touched; an existing config is only
//! replaced with `--force`.

use super::Environment;
use crate::cli::InitArgs;
use crate::config::Config;
use crate::error::{Result, UserDbError};
use crate::fs::atomic_write;
use crate::record::User;
use crate::store::RecordStore;

/// Execute the `userdb init` command.
pub async fn cmd_init(env: &Environment, args: InitArgs) -> Result<()> {
    let ctx = &env.ctx;

    if ctx.config_path.exists() && !args.force {
        return Err(UserDbError::UserError(format!(
            "config file already exists: {}\n\nTo overwrite it, run:\n  userdb init --force",
            ctx.config_path.display()
        )));
    }

    let mut config = Config::default();
    // Keep the resolved data file so the written config points where this run did.
    config.data_file = ctx.data_file.display().to_string();
    config.lock = env.config.lock;
    atomic_write(&ctx.config_path, config.to_yaml()?.as_bytes()).await?;

    let data_created = RecordStore::<User>::new(ctx, &config)
        .create_if_missing()
        .await?;

    println!("Initialized userdb.");
    println!();
    println!("Config:    {}", ctx.config_path.display());
    println!(
        "Data file: {}{}",
        ctx.data_file.display(),
        if data_created { " (created)" } else { " (kept)" }
    );
    println!("Lock file: {}", ctx.lock_path.display());

    Ok(())
}
