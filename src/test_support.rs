use crate::config::LockSettings;
use crate::record::{NewUser, User};

/// Lock settings that tolerate many contenders without slowing tests down.
pub(crate) fn fast_lock_settings() -> LockSettings {
    LockSettings {
        retries: 200,
        min_timeout_ms: 1,
        max_timeout_ms: 10,
        factor: 2,
        ..LockSettings::default()
    }
}

pub(crate) fn user(id: &str) -> User {
    NewUser {
        name: format!("user {}", id),
        age: 30,
        address: format!("{} Main St", id),
        email: format!("{}@example.com", id),
    }
    .into_user(id.to_string())
}

/// Three users with ids "a", "b", "c", in that order.
pub(crate) fn sample_users() -> Vec<User> {
    let mut users = vec![user("a"), user("b"), user("c")];
    users[0].name = "Alice".to_string();
    users[1].name = "Bob".to_string();
    users[2].name = "Carol".to_string();
    users
}
