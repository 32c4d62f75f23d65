use std::path::PathBuf;
use thiserror::Error;

/// Top-level failure kinds surfaced by removal and startup.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store key not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("failed to export {key} to {}: {reason}", .destination.display())]
    Export {
        key: String,
        destination: PathBuf,
        reason: String,
    },
    #[error("store backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<StoreError> for SweepError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => SweepError::NotFound(key),
            StoreError::AccessDenied(msg) => SweepError::Fatal(msg),
            other => SweepError::OperationFailed(other.to_string()),
        }
    }
}
