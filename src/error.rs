//! Storage and service error types

use crate::backend::StorageKind;

/// Boxed error returned by tier drivers (cache clients, repositories).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for storage tier operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a storage tier
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid key: storage keys must be non-empty")]
    InvalidKey,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} backend failure: {source}")]
    Backend {
        kind: StorageKind,
        #[source]
        source: BoxError,
    },
}

impl StorageError {
    /// Wrap a driver fault with the tier it happened in.
    pub fn backend(kind: StorageKind, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            kind,
            source: source.into(),
        }
    }

    /// True for transport, serialization and deadline faults.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

/// Errors surfaced by the orchestrator's public operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Write-through failed: {0}")]
    Storage(#[from] StorageError),
}
