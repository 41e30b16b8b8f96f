//! Error types.

use std::fmt;

/// Errors from operations on a [`Cell`](crate::Cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    /// The cell was destroyed; it accepts no further operations.
    #[error("cell has been destroyed")]
    Destroyed,
}

/// Failure of a persistence medium.
///
/// These never reach the caller of a store operation. They are logged and
/// handed to the registry's error observer, if one is installed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediumError {
    /// The storage area has no room for the entry.
    #[error("storage quota exceeded writing {key} ({needed} bytes, {quota} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    /// A value could not be encoded to, or decoded from, JSON.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The asynchronous database rejected an operation.
    #[error("database error: {0}")]
    Database(String),

    /// An asynchronous operation was issued with no tokio runtime available.
    #[error("no async runtime available for {0}")]
    NoRuntime(String),
}

impl From<serde_json::Error> for MediumError {
    fn from(err: serde_json::Error) -> Self {
        MediumError::Serialization(err.to_string())
    }
}

/// The medium operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
        })
    }
}

/// A medium failure together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediumFailure {
    pub key: String,
    pub operation: Operation,
    pub error: MediumError,
}

/// Errors returned by backends and the store registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A store with this name is already registered.
    #[error("store already exists: {0}")]
    DuplicateName(String),

    /// No store is registered under this name.
    #[error("store does not exist: {0}")]
    NotFound(String),

    /// The backend type tag is not one of the known variants.
    #[error("invalid store type: {0}")]
    UnknownBackendType(String),

    /// The store's cell rejected the operation.
    #[error(transparent)]
    Cell(#[from] CellError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from loading a [`StoreConfig`](crate::StoreConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse store config: {0}")]
    Parse(#[from] toml::de::Error),
}
