//! The record store: the only read/write path to a data file.
//!
//! The whole collection lives in one JSON array in one file. Each call goes
//! through the file's [`FileLock`] critical section and round-trips through
//! the file; nothing is cached between calls.
//!
//! - [`RecordStore::read`] loads the collection and applies a [`Limit`].
//! - [`RecordStore::write`] replaces the whole collection atomically.
//! - [`RecordStore::transact`] runs read, mutate and write inside one lock
//!   scope, so callers composing create/update/delete cannot lose updates.
//!
//! Calling `read` and then `write` as two steps is still allowed, but two
//! callers doing so from the same snapshot will have the second write win.

mod limit;


pub use limit::Limit;

use crate::config::{Config, LockSettings};
use crate::context::{StoreContext, lock_path_for};
use crate::error::{Result, UserDbError};
use crate::fs::atomic_write;
use crate::locks::FileLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// How reads treat edge cases in the stored data and the requested limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Log a malformed data file and read it as empty instead of failing.
    pub lenient: bool,
    /// Read a negative limit as "no limit" instead of "nothing".
    pub clamp_negative_limit: bool,
}

/// A JSON-array file of records guarded by a lock file.
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    path: PathBuf,
    lock: FileLock,
    options: ReadOptions,
    _records: PhantomData<fn() -> T>,
}

impl<T> RecordStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open the store for a resolved context and config.
    pub fn new(ctx: &StoreContext, config: &Config) -> Self {
        Self::open(ctx.data_file.clone(), config.lock).with_options(ReadOptions {
            lenient: config.lenient_reads,
            clamp_negative_limit: config.clamp_negative_limit,
        })
    }

    /// Open the store for a data file, locking `<data file>.lock`.
    pub fn open<P: Into<PathBuf>>(path: P, settings: LockSettings) -> Self {
        let path = path.into();
        let lock = FileLock::new(lock_path_for(&path), settings);
        Self {
            path,
            lock,
            options: ReadOptions::default(),
            _records: PhantomData,
        }
    }

    /// Replace the read options.
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Path of the backing data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lock guarding the data file.
    pub fn lock(&self) -> &FileLock {
        &self.lock
    }

    /// Read at most `limit` records, in stored order.
    ///
    /// `0` means no limit; a limit larger than the collection returns all of
    /// it; a negative limit returns nothing (see [`ReadOptions`]). A missing,
    /// empty or whitespace-only file is an empty collection.
    ///
    /// # Errors
    ///
    /// * `LockError` - The lock could not be acquired
    /// * `MalformedStorage` - The file is not a JSON array of records
    ///   (unless reads are lenient)
    /// * `StorageError` - The file could not be read
    pub async fn read(&self, limit: i64) -> Result<Vec<T>> {
        let lenient = self.options.lenient;
        let records = self
            .lock
            .with_lock("read", || load(&self.path, lenient))
            .await?;

        Ok(Limit::from_raw(limit, self.options.clamp_negative_limit).apply(records))
    }

    /// Replace the whole stored collection with `records`.
    ///
    /// The file is replaced atomically before the lock is released, so no
    /// reader ever sees a partial document.
    ///
    /// # Errors
    ///
    /// * `LockError` - The lock could not be acquired; nothing was written
    /// * `StorageError` - Serialization or the file replacement failed
    pub async fn write(&self, records: &[T]) -> Result<()> {
        let body = serialize(records)?;
        let result = self
            .lock
            .with_lock("write", || atomic_write(&self.path, &body))
            .await;

        if let Err(e) = &result {
            error!(path = %self.path.display(), "write failed: {}", e);
        }
        result
    }

    /// Create the data file holding an empty collection, unless it already
    /// exists. Returns whether the file was created.
    ///
    /// The check and the write happen under one acquisition of the lock, so
    /// data written concurrently by another caller is never replaced.
    pub async fn create_if_missing(&self) -> Result<bool> {
        let body = serialize::<T>(&[])?;
        self.lock
            .with_lock("init", || async {
                let exists = tokio::fs::try_exists(&self.path).await.map_err(|e| {
                    UserDbError::StorageError(format!(
                        "failed to check data file '{}': {}",
                        self.path.display(),
                        e
                    ))
                })?;
                if exists {
                    return Ok(false);
                }
                atomic_write(&self.path, &body).await?;
                Ok(true)
            })
            .await
    }

    /// Read the full collection, let `f` mutate it, and write it back, all
    /// under one acquisition of the lock.
    ///
    /// If `f` returns an error, nothing is written and the error is returned.
    /// The collection is always parsed strictly here: a lenient empty read of
    /// a corrupt file must not be written back over it.
    pub async fn transact<R, F>(&self, action: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R>,
    {
        let result = self
            .lock
            .with_lock(action, || async {
                let mut records = load(&self.path, false).await?;
                let value = f(&mut records)?;
                let body = serialize(&records)?;
                atomic_write(&self.path, &body).await?;
                Ok(value)
            })
            .await;

        if let Err(e @ (UserDbError::StorageError(_) | UserDbError::MalformedStorage(_))) = &result
        {
            error!(path = %self.path.display(), action, "{}", e);
        }
        result
    }
}

/// Load and parse the whole collection. Must be called with the lock held.
async fn load<T: DeserializeOwned>(path: &Path, lenient: bool) -> Result<Vec<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(UserDbError::StorageError(format!(
                "failed to read data file '{}': {}",
                path.display(),
                e
            )));
        }
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str(&content) {
        Ok(records) => Ok(records),
        Err(e) if lenient => {
            warn!(
                path = %path.display(),
                "data file is not a valid record array, reading as empty: {}", e
            );
            Ok(Vec::new())
        }
        Err(e) => Err(UserDbError::MalformedStorage(format!(
            "data file '{}' is not a valid record array: {}",
            path.display(),
            e
        ))),
    }
}

fn serialize<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut body = serde_json::to_vec_pretty(records)
        .map_err(|e| UserDbError::StorageError(format!("failed to serialize records: {}", e)))?;
    body.push(b'\n');
    Ok(body)
}
