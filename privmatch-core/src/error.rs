//! Error types for PrivMatch operations.

use thiserror::Error;

use crate::entity::EntityId;

/// Result type alias using PrivMatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during PrivMatch operations.
///
/// Evaluation of filters and visibility never produces an error: runtime
/// mismatches resolve to a non-match. Errors are reserved for malformed
/// requests and storage failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Embedding dimension mismatch between store and input.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Attempted to insert an entity whose ID already exists.
    #[error("duplicate entity id: {0}")]
    DuplicateId(EntityId),

    /// Entity with the given ID was not found.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// Malformed filter expression.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Malformed request outside the filter tree (limits, bodies).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed privacy settings.
    #[error("invalid visibility: {0}")]
    InvalidVisibility(String),

    /// Empty vector provided where non-empty expected.
    #[error("empty vector not allowed")]
    EmptyVector,

    /// IO error during storage operations.
    #[error("io error: {0}")]
    IoError(String),

    /// WAL corruption detected.
    #[error("WAL corrupted: {0}")]
    WalCorrupted(String),

    /// Store could not be opened or persisted.
    #[error("store error: {0}")]
    StoreError(String),
}

impl Error {
    /// Returns true if the error was caused by caller input rather than
    /// by the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::DimensionMismatch { .. }
                | Error::InvalidFilter(_)
                | Error::InvalidRequest(_)
                | Error::InvalidVisibility(_)
                | Error::EmptyVector
        )
    }
}
