//! Locking subsystem for userdb.
//!
//! Every access to a data file runs inside the critical section of that
//! file's lock, `<data file>.lock`. Reads are serialized too, not just writes.
//!
//! # Lock Files
//!
//! Lock files are created using **create_new** semantics (exclusive create),
//! so only one holder, in this process or any other on the machine, can own a
//! given lock at a time. The lock is advisory: nothing stops a process that
//! ignores it from touching the data file.
//!
//! # Lock Metadata
//!
//! Each lock file contains JSON metadata:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID (optional)
//! - `token`: Unique per acquisition, so a holder only ever removes its own lock
//! - `created_at`: RFC3339 timestamp
//! - `action`: The operation being performed (read/write/create/...)
//!
//! # Acquisition
//!
//! A held lock is retried with exponential backoff (see [`LockSettings`]).
//! A lock older than `stale_ms` is presumed abandoned and is removed by the
//! next acquirer. Acquirers that find the same stale lock take turns through a
//! `<lock>.break` marker file, and only the first one removes it. If the original holder was only slow, two sections can then
//! overlap; the staleness threshold has to stay well above the longest
//! expected critical section.
//!
//! # RAII Guards
//!
//! Locks are held through [`LockGuard`], which removes the lock file when
//! released or dropped. Release failures are logged and never propagated.

use crate::config::LockSettings;
use crate::error::{Result, UserDbError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Suffix of the marker file held while breaking a stale lock.
const BREAK_SUFFIX: &str = ".break";

/// Age after which a break marker is presumed left by a crashed breaker.
const BREAK_STALE_MS: i64 = 1000;

/// Lock metadata stored in lock files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Identifies this particular acquisition.
    pub token: String,

    /// Timestamp when the lock was created (RFC3339).
    pub created_at: DateTime<Utc>,

    /// The operation being performed.
    pub action: String,
}

impl LockMetadata {
    /// Create new lock metadata with the current timestamp.
    pub fn new(action: &str) -> Self {
        Self {
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            token: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    /// Parse lock metadata from lock file content.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| UserDbError::LockError(format!("failed to parse lock metadata: {}", e)))
    }

    /// Serialize lock metadata to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| UserDbError::LockError(format!("failed to serialize lock metadata: {}", e)))
    }

    /// Calculate the age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }
}

/// Get the owner string for lock metadata.
fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Format a lock age as a short human-readable string.
pub fn format_age(age: Duration) -> String {
    let millis = age.num_milliseconds().max(0);
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{}.{}s", millis / 1000, (millis % 1000) / 100)
    } else if millis < 3_600_000 {
        format!("{}m {}s", millis / 60_000, (millis % 60_000) / 1000)
    } else {
        format!("{}h {}m", millis / 3_600_000, (millis % 3_600_000) / 60_000)
    }
}

/// Information about a lock file currently on disk.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// Parsed metadata, if the lock file holds valid metadata.
    ///
    /// `None` for a lock that is still being written or was left by a
    /// foreign tool; its age then comes from the file modification time.
    pub metadata: Option<LockMetadata>,

    /// How long the lock has been held.
    pub age: Duration,

    /// Whether the lock is older than the staleness threshold.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.metadata {
            Some(meta) => write!(
                f,
                "{} (owner: {}, age: {}, action: {}{})",
                self.path.display(),
                meta.owner,
                format_age(self.age),
                meta.action,
                if self.is_stale { ", STALE" } else { "" }
            ),
            None => write!(
                f,
                "{} (unreadable metadata, age: {}{})",
                self.path.display(),
                format_age(self.age),
                if self.is_stale { ", STALE" } else { "" }
            ),
        }
    }
}

/// RAII guard for a lock file.
///
/// When dropped, the lock file is removed if it still belongs to this guard.
/// If removal fails, a warning is logged but no panic occurs.
#[derive(Debug)]
pub struct LockGuard {
    /// Path to the lock file.
    path: PathBuf,

    /// Token written into the lock file at acquisition.
    token: String,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    fn new(path: PathBuf, token: String) -> Self {
        Self {
            path,
            token,
            released: false,
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, reporting failure to the caller.
    ///
    /// Fails if the lock file is gone, or if it was broken as stale and now
    /// belongs to someone else. In the latter case the other holder's lock is
    /// left in place.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            UserDbError::LockError(format!(
                "failed to release lock '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        check_owner(&self.path, &content, &self.token)?;

        fs::remove_file(&self.path).await.map_err(|e| {
            UserDbError::LockError(format!(
                "failed to release lock '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(lock = %self.path.display(), "released lock");
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        // Drop cannot await; this path only runs when the holder unwound early.
        let outcome = std::fs::read_to_string(&self.path)
            .map_err(|e| {
                UserDbError::LockError(format!(
                    "failed to release lock '{}': {}",
                    self.path.display(),
                    e
                ))
            })
            .and_then(|content| check_owner(&self.path, &content, &self.token))
            .and_then(|()| {
                std::fs::remove_file(&self.path).map_err(|e| {
                    UserDbError::LockError(format!(
                        "failed to release lock '{}': {}",
                        self.path.display(),
                        e
                    ))
                })
            });

        if let Err(e) = outcome {
            warn!("{}", e);
        }
    }
}

fn check_owner(path: &Path, content: &str, token: &str) -> Result<()> {
    match LockMetadata::from_json(content) {
        Ok(meta) if meta.token == token => Ok(()),
        Ok(meta) => Err(UserDbError::LockError(format!(
            "lock '{}' was broken as stale and is now held by {} ({}); leaving it in place",
            path.display(),
            meta.owner,
            meta.action
        ))),
        Err(_) => Err(UserDbError::LockError(format!(
            "lock '{}' no longer holds our metadata; leaving it in place",
            path.display()
        ))),
    }
}

/// An advisory lock on one data file.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
    settings: LockSettings,
}

impl FileLock {
    /// Create a lock handle for the given lock file path. Nothing is touched
    /// on disk until [`FileLock::acquire`].
    pub fn new<P: Into<PathBuf>>(path: P, settings: LockSettings) -> Self {
        Self {
            path: path.into(),
            settings,
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the retry/staleness settings.
    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Acquire the lock, retrying with backoff and breaking stale locks.
    ///
    /// # Returns
    ///
    /// * `Ok(LockGuard)` - Successfully acquired lock with RAII guard
    /// * `Err(UserDbError::LockError)` - Still held after all retries, or the
    ///   lock file could not be created
    pub async fn acquire(&self, action: &str) -> Result<LockGuard> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                UserDbError::LockError(format!(
                    "failed to create lock directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut attempt: u32 = 0;
        // Each break is followed by an immediate retry; bound them so two
        // processes that keep planting stale locks cannot spin us forever.
        let mut breaks_left = self.settings.retries.saturating_add(1);

        loop {
            let metadata = LockMetadata::new(action);
            match try_create(&self.path, &metadata).await {
                Ok(guard) => {
                    debug!(lock = %self.path.display(), action, attempt, "acquired lock");
                    return Ok(guard);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(UserDbError::LockError(format!(
                        "failed to acquire lock '{}': {}",
                        self.path.display(),
                        e
                    )));
                }
            }

            if breaks_left > 0 && self.break_if_stale().await? {
                breaks_left -= 1;
                continue;
            }

            if attempt >= self.settings.retries {
                let holder = match self.inspect().await {
                    Ok(Some(info)) => format!("\nLock: {}", info),
                    _ => format!("\nLock: {}", self.path.display()),
                };
                return Err(UserDbError::LockError(format!(
                    "lock is held by another process after {} retries{}",
                    self.settings.retries, holder
                )));
            }

            let delay = self.settings.backoff(attempt);
            debug!(
                lock = %self.path.display(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "lock held, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Run `action` while holding the lock.
    ///
    /// The lock is released whether the action succeeds or fails, and before
    /// its result is returned. A failed release is logged and does not change
    /// the result. If the lock cannot be acquired the action never runs.
    pub async fn with_lock<F, Fut, T>(&self, action: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.acquire(action).await?;
        let result = f().await;
        if let Err(e) = guard.release().await {
            warn!("{}", e);
        }
        result
    }

    /// Report the current holder of the lock without acquiring it.
    ///
    /// Returns `Ok(None)` when the lock is free.
    pub async fn inspect(&self) -> Result<Option<LockInfo>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(UserDbError::LockError(format!(
                    "failed to read lock file '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let metadata = LockMetadata::from_json(&content).ok();
        let age = match &metadata {
            Some(meta) => meta.age(),
            None => match modified_age(&self.path).await {
                Some(age) => age,
                // Removed between the read and the stat.
                None => return Ok(None),
            },
        };

        Ok(Some(LockInfo {
            path: self.path.clone(),
            metadata,
            age,
            is_stale: age > self.settings.stale_after(),
        }))
    }

    /// Forcibly remove the lock file, whoever holds it.
    ///
    /// Only safe when the holder is known to be dead.
    ///
    /// # Returns
    ///
    /// * `Ok(LockInfo)` - Information about the cleared lock
    /// * `Err(UserDbError::UserError)` - No lock file exists
    pub async fn clear(&self) -> Result<LockInfo> {
        let info = self.inspect().await?.ok_or_else(|| {
            UserDbError::UserError(format!("lock '{}' does not exist", self.path.display()))
        })?;

        fs::remove_file(&self.path).await.map_err(|e| {
            UserDbError::LockError(format!(
                "failed to clear lock '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        warn!(lock = %info, "lock cleared by force");
        Ok(info)
    }

    /// Remove the lock if it is stale. Returns `true` when the caller should
    /// retry immediately (the lock was removed or disappeared on its own).
    ///
    /// Breakers are serialized through `<lock>.break` and judge staleness
    /// again while holding it, so a lock that another breaker has already
    /// replaced with a fresh one is left alone.
    async fn break_if_stale(&self) -> Result<bool> {
        match self.inspect().await? {
            None => return Ok(true),
            Some(info) if !info.is_stale => return Ok(false),
            Some(_) => {}
        }

        let break_path = break_path_for(&self.path);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&break_path)
            .await
        {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Another contender is breaking the lock; back off unless it died doing so.
                if let Some(age) = modified_age(&break_path).await
                    && age > Duration::milliseconds(BREAK_STALE_MS)
                {
                    warn!(path = %break_path.display(), "removing abandoned break marker");
                    let _ = fs::remove_file(&break_path).await;
                }
                return Ok(false);
            }
            Err(e) => {
                return Err(UserDbError::LockError(format!(
                    "failed to create break marker '{}': {}",
                    break_path.display(),
                    e
                )));
            }
        }

        let outcome = self.remove_if_still_stale().await;

        if let Err(e) = fs::remove_file(&break_path).await {
            warn!(path = %break_path.display(), "failed to remove break marker: {}", e);
        }
        outcome
    }

    /// Must be called holding the break marker.
    async fn remove_if_still_stale(&self) -> Result<bool> {
        let info = match self.inspect().await? {
            Some(info) => info,
            None => return Ok(true),
        };

        if !info.is_stale {
            return Ok(false);
        }

        warn!(lock = %info, "breaking stale lock");
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(UserDbError::LockError(format!(
                "failed to break stale lock '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Path of the marker that serializes stale-lock breakers: `<lock>.break`.
fn break_path_for(lock_path: &Path) -> PathBuf {
    let mut name = lock_path.as_os_str().to_os_string();
    name.push(BREAK_SUFFIX);
    PathBuf::from(name)
}

/// Create the lock file exclusively and write metadata into it.
async fn try_create(path: &Path, metadata: &LockMetadata) -> std::io::Result<LockGuard> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let json = metadata
        .to_json()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let written = async {
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        // Clean up so a half-written lock does not block everyone until it goes stale
        let _ = fs::remove_file(path).await;
        return Err(e);
    }

    Ok(LockGuard::new(path.to_path_buf(), metadata.token.clone()))
}

async fn modified_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).await.ok()?.modified().ok()?;
    let modified: DateTime<Utc> = modified.into();
    Some(Utc::now().signed_duration_since(modified))
}
