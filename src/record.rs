//! User records as stored in the data file.
//!
//! The store itself only cares about ids (through [`Keyed`]); everything else
//! about a record is opaque to it. Known fields are typed here, while unknown
//! fields are preserved in `extra` so records written by newer tools survive a
//! round trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// A record with a stable, unique identifier.
pub trait Keyed {
    /// The record's id, used as the lookup key for update and delete.
    fn id(&self) -> &str;
}

/// Generate a fresh record id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Generator-assigned id, stable for the record's lifetime.
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Kept as a JSON number so integers and decimals round-trip exactly.
    #[serde(default = "default_age")]
    pub age: Number,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub email: String,

    /// Any fields not explicitly defined above.
    /// Using BTreeMap for deterministic serialization order.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_age() -> Number {
    Number::from(0)
}

impl Keyed for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Fields supplied when creating a user; the id is generated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub age: u32,
    pub address: String,
    pub email: String,
}

impl NewUser {
    /// Build the stored record under the given id.
    pub fn into_user(self, id: String) -> User {
        User {
            id,
            name: self.name,
            age: Number::from(self.age),
            address: self.address,
            email: self.email,
            extra: BTreeMap::new(),
        }
    }
}

/// Partial update of a user; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub address: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    /// Whether the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.address.is_none() && self.email.is_none()
    }

    /// Apply the present fields to `user`. The id is never touched.
    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(age) = self.age {
            user.age = Number::from(age);
        }
        if let Some(address) = &self.address {
            user.address = address.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
    }
}
