//! Create, read, update and delete for user records.
//!
//! Each mutation is a read-modify-write over the whole collection, run as one
//! [`RecordStore::transact`] call so that concurrent mutations serialize
//! instead of overwriting each other. Lookups by id are linear scans.

use crate::error::{Result, UserDbError};
use crate::record::{Keyed, NewUser, User, UserPatch, generate_id};
use crate::store::RecordStore;
use tracing::info;

/// Index of the record with the given id, if any.
pub fn position<T: Keyed>(records: &[T], id: &str) -> Option<usize> {
    records.iter().position(|r| r.id() == id)
}

/// User operations over a record store.
#[derive(Debug, Clone)]
pub struct UserService {
    store: RecordStore<User>,
}

impl UserService {
    pub fn new(store: RecordStore<User>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore<User> {
        &self.store
    }

    /// List at most `limit` users (0 = all).
    pub async fn list(&self, limit: i64) -> Result<Vec<User>> {
        self.store.read(limit).await
    }

    /// Fetch one user by id.
    pub async fn get(&self, id: &str) -> Result<User> {
        let users = self.store.read(0).await?;
        position(&users, id)
            .map(|i| users[i].clone())
            .ok_or_else(|| UserDbError::NotFound(id.to_string()))
    }

    /// Append a new user under a freshly generated id.
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let created = self
            .store
            .transact("create", move |users| {
                let mut id = generate_id();
                while position(users, &id).is_some() {
                    id = generate_id();
                }
                let user = new_user.into_user(id);
                users.push(user.clone());
                Ok(user)
            })
            .await?;

        info!(id = %created.id, "created user");
        Ok(created)
    }

    /// Apply `patch` to the user with the given id.
    ///
    /// An empty patch is rejected before the store is touched.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<User> {
        if patch.is_empty() {
            return Err(UserDbError::UserError(
                "nothing to update: give at least one field".to_string(),
            ));
        }

        let updated = self
            .store
            .transact("update", |users| {
                let index =
                    position(users, id).ok_or_else(|| UserDbError::NotFound(id.to_string()))?;
                patch.apply(&mut users[index]);
                Ok(users[index].clone())
            })
            .await?;

        info!(id, "updated user");
        Ok(updated)
    }

    /// Remove the user with the given id and return it.
    ///
    /// A missing id reports `NotFound` and leaves the file untouched.
    pub async fn delete(&self, id: &str) -> Result<User> {
        let removed = self
            .store
            .transact("delete", |users| {
                let index =
                    position(users, id).ok_or_else(|| UserDbError::NotFound(id.to_string()))?;
                Ok(users.remove(index))
            })
            .await?;

        info!(id, "deleted user");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fast_lock_settings, sample_users};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn service_with_samples(temp_dir: &TempDir) -> UserService {
        let store = RecordStore::open(temp_dir.path().join("users.json"), fast_lock_settings());
        store.write(&sample_users()).await.unwrap();
        UserService::new(store)
    }

    fn grace() -> NewUser {
        NewUser {
            name: "Grace".to_string(),
            age: 45,
            address: "Arlington".to_string(),
            email: "grace@example.com".to_string(),
        }
    }

    #[test]
    fn test_position() {
        let users = sample_users();
        assert_eq!(position(&users, "b"), Some(1));
        assert_eq!(position(&users, "z"), None);
    }

    #[tokio::test]
    async fn test_create_appends_with_fresh_id() {
        let temp_dir = TempDir::new().unwrap();
        let service = service_with_samples(&temp_dir).await;

        let created = service.create(grace()).await.unwrap();

        let users = service.list(0).await.unwrap();
        assert_eq!(users.len(), 4);
        assert_eq!(users[3], created);
        assert!(!["a", "b", "c"].contains(&created.id.as_str()));
    }

    #[tokio::test]
    async fn test_create_on_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::open(temp_dir.path().join("users.json"), fast_lock_settings());
        let service = UserService::new(store);

        let created = service.create(grace()).await.unwrap();
        assert_eq!(service.list(0).await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_get() {
        let temp_dir = TempDir::new().unwrap();
        let service = service_with_samples(&temp_dir).await;

        assert_eq!(service.get("c").await.unwrap().name, "Carol");
        assert!(matches!(
            service.get("zzz").await,
            Err(UserDbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_changes_only_given_fields() {
        let temp_dir = TempDir::new().unwrap();
        let service = service_with_samples(&temp_dir).await;

        let patch = UserPatch {
            email: Some("bob@new.example".to_string()),
            ..UserPatch::default()
        };
        let updated = service.update("b", &patch).await.unwrap();

        assert_eq!(updated.email, "bob@new.example");
        assert_eq!(updated.name, "Bob");
        assert_eq!(service.get("b").await.unwrap(), updated);
        // Order is preserved.
        let ids: Vec<String> = service.list(0).await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_update_missing_id() {
        let temp_dir = TempDir::new().unwrap();
        let service = service_with_samples(&temp_dir).await;
        let before = std::fs::read_to_string(service.store().path()).unwrap();

        let patch = UserPatch {
            name: Some("Nobody".to_string()),
            ..UserPatch::default()
        };
        let err = service.update("zzz", &patch).await.unwrap_err();

        assert!(matches!(err, UserDbError::NotFound(_)));
        assert_eq!(std::fs::read_to_string(service.store().path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_patch() {
        let temp_dir = TempDir::new().unwrap();
        let service = service_with_samples(&temp_dir).await;

        let err = service.update("a", &UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, UserDbError::UserError(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let service = service_with_samples(&temp_dir).await;

        let removed = service.delete("b").await.unwrap();

        assert_eq!(removed.name, "Bob");
        let ids: Vec<String> = service.list(0).await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_delete_missing_id_leaves_collection_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let service = service_with_samples(&temp_dir).await;
        let before = service.list(0).await.unwrap();

        let err = service.delete("zzz").await.unwrap_err();
        assert!(matches!(err, UserDbError::NotFound(_)));
        assert_eq!(service.list(0).await.unwrap(), before);

        // Deleting twice reports not-found the second time.
        service.delete("a").await.unwrap();
        assert!(matches!(
            service.delete("a").await,
            Err(UserDbError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_on_same_record_both_apply() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(service_with_samples(&temp_dir).await);

        let name_change = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let patch = UserPatch {
                    name: Some("Alicia".to_string()),
                    ..UserPatch::default()
                };
                service.update("a", &patch).await
            })
        };
        let email_change = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let patch = UserPatch {
                    email: Some("alicia@example.com".to_string()),
                    ..UserPatch::default()
                };
                service.update("a", &patch).await
            })
        };

        name_change.await.unwrap().unwrap();
        email_change.await.unwrap().unwrap();

        let stored = service.get("a").await.unwrap();
        assert_eq!(stored.name, "Alicia");
        assert_eq!(stored.email, "alicia@example.com");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_and_deletes() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(service_with_samples(&temp_dir).await);

        let mut handles = Vec::new();
        for i in 0..10 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let mut new_user = grace();
                new_user.age = i;
                service.create(new_user).await.map(|_| ())
            }));
        }
        for id in ["a", "b", "c"] {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move { service.delete(id).await.map(|_| ()) }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let users = service.list(0).await.unwrap();
        assert_eq!(users.len(), 10);
        assert!(users.iter().all(|u| u.name == "Grace"));
    }
}
