//! Application error types

use amparo_domain::{AuthFailure, DomainError};
use thiserror::Error;

use crate::ports::ProfileStoreError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// An identity provider operation failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthFailure),

    /// A profile store operation failed.
    #[error("profile store error: {0}")]
    Profile(#[from] ProfileStoreError),

    /// The operation needs a session and there is none.
    #[error("no active session")]
    NoSession,

    /// The current identity has no resolved profile.
    #[error("profile not available")]
    ProfileUnavailable,
}

impl ApplicationError {
    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(failure) => failure.is_retryable(),
            Self::Profile(error) => error.is_retryable(),
            Self::Domain(_) | Self::NoSession | Self::ProfileUnavailable => false,
        }
    }
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
