//! Filesystem utilities for userdb.
//!
//! This module provides atomic file replacement, which is what keeps the data
//! file a complete JSON document for any reader, locked or not.

pub mod atomic;

pub use atomic::atomic_write;
