//! Depreciation error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while scheduling a single profile.
///
/// Everything except `AlreadyPosted` is reported per asset; `AlreadyPosted`
/// is the idempotency short-circuit and is silently skipped, so it has no kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DepreciationError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Unsupported depreciation method '{0}'")]
    UnsupportedMethod(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Profile {profile_id} already posted for {period}")]
    AlreadyPosted { profile_id: String, period: String },
}

impl DepreciationError {
    pub fn kind(&self) -> Option<AssetErrorKind> {
        match self {
            DepreciationError::InvalidProfile(_) => Some(AssetErrorKind::InvalidProfile),
            DepreciationError::UnsupportedMethod(_) => Some(AssetErrorKind::UnsupportedMethod),
            DepreciationError::Storage(_) => Some(AssetErrorKind::StorageError),
            DepreciationError::AlreadyPosted { .. } => None,
        }
    }
}

impl From<crate::errors::Error> for DepreciationError {
    fn from(err: crate::errors::Error) -> Self {
        DepreciationError::Storage(err.to_string())
    }
}

/// Error kind as reported in run results and run logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetErrorKind {
    InvalidProfile,
    UnsupportedMethod,
    StorageError,
}
