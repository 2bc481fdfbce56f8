//! Atomic filesystem operations for userdb.
//!
//! The data file is never written in place. Every write follows this pattern:
//! 1. Write content to a uniquely named temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target file
//! 4. Sync the parent directory so the rename itself is durable
//!
//! `rename()` is atomic when source and destination share a filesystem, so a
//! reader that does not take the lock still sees either the old document or
//! the new one, never a prefix.
//!
//! On crash, a temporary file may remain (named `.{filename}.{id}.tmp`).

use crate::error::{Result, UserDbError};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Atomically write bytes to a file.
///
/// # Returns
///
/// * `Ok(())` - On successful atomic write
/// * `Err(UserDbError::StorageError)` - On write or rename failure
pub async fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await.map_err(|e| {
            UserDbError::StorageError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;

    write_and_sync(&temp_path, content).await?;

    atomic_replace(&temp_path, path).await?;

    Ok(())
}

/// Generate a temporary file path in the same directory as the target.
///
/// The random suffix keeps two writers (for example one that broke a stale
/// lock and the slow holder it broke) from sharing a temp file.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            UserDbError::StorageError(format!("invalid data file path '{}'", target.display()))
        })?;

    let temp_name = format!(".{}.{}.tmp", filename, uuid::Uuid::new_v4().simple());
    Ok(parent.join(temp_name))
}

/// Write content to a file and sync to disk.
async fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).await.map_err(|e| {
        UserDbError::StorageError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    if let Err(e) = file.write_all(content).await {
        let _ = fs::remove_file(path).await;
        return Err(UserDbError::StorageError(format!(
            "failed to write to temporary file '{}': {}",
            path.display(),
            e
        )));
    }

    if let Err(e) = file.sync_all().await {
        let _ = fs::remove_file(path).await;
        return Err(UserDbError::StorageError(format!(
            "failed to sync temporary file '{}' to disk: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

/// Rename the source file over the target and persist the directory entry.
async fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    if let Err(e) = fs::rename(source, target).await {
        let _ = fs::remove_file(source).await;
        return Err(UserDbError::StorageError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        )));
    }

    // Directory fsync is best-effort; not every platform allows opening a directory.
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent).await
    {
        let _ = dir.sync_all().await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_atomic_write_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("users.json");

        atomic_write(&file_path, b"[]").await.unwrap();

        let content = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "[]");
    }

    #[tokio::test]
    async fn test_atomic_write_replace_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("users.json");

        std::fs::write(&file_path, "[{\"id\":\"old\"}]").unwrap();

        atomic_write(&file_path, b"[{\"id\":\"new\"}]").await.unwrap();

        let content = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "[{\"id\":\"new\"}]");
    }

    #[tokio::test]
    async fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dirs").join("users.json");

        atomic_write(&file_path, b"[]").await.unwrap();

        assert!(file_path.exists());
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("users.json");

        atomic_write(&file_path, b"[1]").await.unwrap();
        atomic_write(&file_path, b"[1,2]").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["users.json".to_string()]);
    }

    #[tokio::test]
    async fn test_atomic_write_empty_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("empty.json");

        atomic_write(&file_path, b"").await.unwrap();

        let content = std::fs::read(&file_path).unwrap();
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn test_atomic_write_onto_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be makes rename fail.
        let file_path = temp_dir.path().join("users.json");
        std::fs::create_dir(&file_path).unwrap();
        std::fs::write(file_path.join("occupant"), "x").unwrap();

        let result = atomic_write(&file_path, b"[]").await;
        assert!(matches!(result, Err(UserDbError::StorageError(_))));

        // The temp file was cleaned up.
        let leftovers = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_generate_temp_path() {
        let target = Path::new("/some/path/users.json");
        let temp = generate_temp_path(target).unwrap();
        let name = temp.file_name().unwrap().to_str().unwrap();

        assert_eq!(temp.parent().unwrap(), Path::new("/some/path"));
        assert!(name.starts_with(".users.json."));
        assert!(name.ends_with(".tmp"));
        assert_ne!(temp, generate_temp_path(target).unwrap());
    }

    #[tokio::test]
    async fn test_atomic_write_concurrent_same_target() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("users.json");

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let path = file_path.clone();
                tokio::spawn(async move {
                    let body = format!("[{}]", i);
                    atomic_write(&path, body.as_bytes()).await.unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        // Whichever writer won, the file holds one complete document.
        let content = std::fs::read_to_string(&file_path).unwrap();
        let parsed: Vec<u32> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
