//! Storage error types.

use thiserror::Error;

/// Errors that can occur in the storage arena.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// No entry exists for the given key.
    #[error("No entry for key: {0}")]
    NotFound(String),

    /// An entry already exists for the given key.
    #[error("Entry already exists for key: {0}")]
    AlreadyExists(String),

    /// The entry was modified since it was read.
    #[error("Version conflict for key {key}: expected {expected}, found {actual}")]
    VersionConflict {
        key: String,
        expected: u64,
        actual: u64,
    },
}

/// Outcome of a closure-based atomic update.
///
/// Separates storage-level failures (missing entry) from the caller's own
/// rejection of the new value, so the caller's error type passes through
/// unchanged.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UpdateError<E> {
    /// No entry exists for the given key.
    #[error("No entry for key: {0}")]
    NotFound(String),

    /// The update closure rejected the new value; the entry is untouched.
    #[error("{0}")]
    Rejected(E),
}
