//! Implementations of `userdb lock status` and `userdb lock clear`.

use super::Environment;
use crate::cli::LockClearArgs;
use crate::error::{Result, UserDbError};
use crate::locks::{FileLock, LockInfo, format_age};

/// The lock the user store takes around every access.
fn data_lock(env: &Environment) -> FileLock {
    env.user_service().store().lock().clone()
}

pub async fn cmd_lock_status(env: &Environment) -> Result<()> {
    let lock = data_lock(env);

    let Some(info) = lock.inspect().await? else {
        println!("Lock is free: {}", lock.path().display());
        return Ok(());
    };

    println!("Lock is held:");
    print_lock_details(&info);
    if info.is_stale {
        println!(
            "    Status:     STALE (exceeds {} ms threshold)",
            lock.settings().stale_ms
        );
        println!();
        println!("The next acquirer will break it. To clear it now: `userdb lock clear --force`.");
    }

    Ok(())
}

pub async fn cmd_lock_clear(env: &Environment, args: LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(UserDbError::UserError(
            "refusing to clear lock without --force flag.\n\n\
             Clearing the lock can corrupt the data file if the holder is still active.\n\
             Only clear it if you are certain the holder has crashed.\n\n\
             To clear the lock, run:\n  userdb lock clear --force"
                .to_string(),
        ));
    }

    let cleared = data_lock(env).clear().await?;

    println!("Cleared lock.");
    println!();
    print_lock_details(&cleared);
    if cleared.is_stale {
        println!("    Status:     was STALE");
    }

    Ok(())
}

fn print_lock_details(info: &LockInfo) {
    match &info.metadata {
        Some(meta) => {
            println!("    Owner:      {}", meta.owner);
            if let Some(pid) = meta.pid {
                println!("    PID:        {}", pid);
            }
            println!(
                "    Created:    {}",
                meta.created_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
            );
            println!("    Action:     {}", meta.action);
        }
        None => println!("    Metadata:   unreadable"),
    }
    println!("    Age:        {}", format_age(info.age));
    println!("    Path:       {}", info.path.display());
}
