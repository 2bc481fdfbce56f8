//! Exit code constants for the userdb CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: No record with the requested id
//! - 3: Storage failure (malformed data file, read/write error)
//! - 4: Lock acquisition failure (busy, retry later)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Lookup by id found no record.
pub const NOT_FOUND: i32 = 2;

/// Storage failure: malformed data file or I/O error.
pub const STORAGE_FAILURE: i32 = 3;

/// Lock acquisition failure: the data file lock could not be acquired.
pub const LOCK_FAILURE: i32 = 4;
