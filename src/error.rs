//! Error types for colbitmap
//!
//! Provides a unified error type for all store operations.
//!
//! Callers mostly care about two classes:
//! - "not found": the cell is absent and nothing materialized it
//! - "IO failure": the backend failed, or what it returned could not be decoded

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for colbitmap operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Cell not found (column {col})")]
    NotFound { col: u64 },

    // -------------------------------------------------------------------------
    // Backend Errors (IO failures)
    // -------------------------------------------------------------------------
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Corrupted stored value: {0}")]
    Corrupted(String),

    #[error("Batch of {attempted} mutations failed after {applied} were applied: {source}")]
    BatchFailed {
        /// Mutations carried by the failing batch
        attempted: usize,
        /// Mutations committed by earlier batches of the same flush
        applied: usize,
        #[source]
        source: Box<StoreError>,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True when the cell was absent and no default was materialized
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// True for backend unavailability, protocol errors and undecodable data
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Backend(_) | StoreError::Corrupted(_) | StoreError::BatchFailed { .. }
        )
    }
}
