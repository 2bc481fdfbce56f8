//! CLI argument parsing for userdb.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// userdb: user records in a single JSON file.
///
/// Every command takes the data file's lock for the duration of its file
/// access, so any number of concurrent invocations can share one file.
#[derive(Parser, Debug)]
#[command(name = "userdb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./userdb.yaml, optional).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data file, overriding `data_file` from the config.
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands for userdb.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file and an empty data file.
    Init(InitArgs),

    /// List users in stored order.
    List(ListArgs),

    /// Show one user by id.
    Show(IdArgs),

    /// Add a new user with a generated id.
    Add(AddArgs),

    /// Update fields of an existing user.
    Update(UpdateArgs),

    /// Delete a user by id.
    Delete(IdArgs),

    /// Lock management commands.
    ///
    /// Inspect or clear the data file lock.
    Lock(LockCommand),
}

/// Arguments for the `init` command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Return at most this many users (0 = all; default from config).
    #[arg(short, long, allow_negative_numbers = true)]
    pub limit: Option<i64>,
}

/// A single user id.
#[derive(Args, Debug)]
pub struct IdArgs {
    /// User id.
    pub id: String,
}

/// Arguments for the `add` command.
#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub age: u32,

    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub email: String,
}

/// Arguments for the `update` command.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// User id.
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub age: Option<u32>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub email: Option<String>,
}

/// Lock subcommands.
#[derive(Args, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show who holds the data file lock, its age, and whether it is stale.
    Status,

    /// Remove the data file lock.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Args, Debug)]
pub struct LockClearArgs {
    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
