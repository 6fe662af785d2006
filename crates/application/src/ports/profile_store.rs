//! Profile store port
//!
//! Defines the interface for reading and updating authorization profiles in
//! the external data store.

use async_trait::async_trait;

use amparo_domain::{IdentityId, ProfilePatch, ProfileRow, Role};

/// Errors that can occur during profile store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileStoreError {
    /// The store could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// There is no session to authorize the request with.
    #[error("no session to authorize the request")]
    Unauthorized,

    /// The store refused the request.
    #[error("store rejected the request with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the store.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProfileStoreError {
    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Unauthorized | Self::InvalidResponse(_) => false,
        }
    }
}

/// Repository trait for authorization profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Reads the role of an identity.
    ///
    /// Implementations must use a privileged path that does not re-enter the
    /// row-level policy guarding the profile table, since that policy itself
    /// depends on the role.
    ///
    /// # Errors
    /// Returns an error if the role cannot be read or is not a known role.
    async fn read_role(&self, id: IdentityId) -> Result<Role, ProfileStoreError>;

    /// Reads the profile row of an identity.
    ///
    /// # Returns
    /// `None` if the identity has no profile row.
    async fn read_profile(&self, id: IdentityId) -> Result<Option<ProfileRow>, ProfileStoreError>;

    /// Applies a partial update to an identity's profile.
    ///
    /// # Arguments
    /// * `id` - Identity whose profile is updated
    /// * `patch` - Fields to change
    ///
    /// # Errors
    /// Returns an error if the store rejects or never receives the update.
    async fn update_profile(&self, id: IdentityId, patch: &ProfilePatch)
    -> Result<(), ProfileStoreError>;
}
