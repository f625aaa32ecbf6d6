//! Controller error types.

use thiserror::Error;

use store::StoreError;

/// Errors that can occur while reconciling fleet resources.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A cluster machine is missing its cluster label
    #[error("cluster machine {0} doesn't have the cluster label set")]
    MissingClusterLabel(String),

    /// Provisioner plug-in failure outside of step execution
    /// (step failures are reported through the request status instead)
    #[error("provisioner error: {0:#}")]
    Provisioner(anyhow::Error),

    /// Controller registration or settings problem
    #[error("invalid controller configuration: {0}")]
    InvalidConfiguration(String),
}

impl ControllerError {
    /// True if the underlying store error was a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControllerError::Store(err) if err.is_not_found())
    }
}
