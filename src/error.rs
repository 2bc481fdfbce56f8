//! Error types for userdb.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for userdb operations.
///
/// Each variant maps to a specific exit code so the outer surface can tell
/// "busy, retry" apart from "not found" and "storage is broken".
#[derive(Error, Debug)]
pub enum UserDbError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// No record matched the requested id.
    #[error("record '{0}' not found")]
    NotFound(String),

    /// The data file is non-empty but is not a JSON array of records.
    #[error("malformed storage: {0}")]
    MalformedStorage(String),

    /// Reading, serializing or writing the data file failed.
    #[error("storage failure: {0}")]
    StorageError(String),

    /// Lock could not be acquired within the retry budget.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),
}

impl UserDbError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            UserDbError::UserError(_) => exit_codes::USER_ERROR,
            UserDbError::NotFound(_) => exit_codes::NOT_FOUND,
            UserDbError::MalformedStorage(_) => exit_codes::STORAGE_FAILURE,
            UserDbError::StorageError(_) => exit_codes::STORAGE_FAILURE,
            UserDbError::LockError(_) => exit_codes::LOCK_FAILURE,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UserDbError::LockError(_))
    }
}

/// Result type alias for userdb operations.
pub type Result<T> = std::result::Result<T, UserDbError>;
