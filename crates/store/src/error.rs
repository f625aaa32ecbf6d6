//! Store error types.

use thiserror::Error;

use crate::metadata::ResourceRef;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed resource does not exist
    #[error("resource not found: {0}")]
    NotFound(ResourceRef),

    /// Optimistic-concurrency version check failed
    #[error("version conflict on {reference}: expected version {expected}")]
    Conflict {
        reference: ResourceRef,
        expected: u64,
    },

    /// The resource is not in a state that permits the operation
    /// (e.g. destroying a resource that is not teardown-ready)
    #[error("operation not permitted on {reference}: {reason}")]
    FailedPrecondition {
        reference: ResourceRef,
        reason: String,
    },

    /// Spec payload failed to (de)serialize
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operation was canceled; callers propagate this unchanged
    #[error("operation canceled")]
    Canceled,

    /// Backend failure
    #[error("store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// True if the error is a [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// True if the error is a [`StoreError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
