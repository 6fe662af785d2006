//! Profile resolution.
//!
//! Combines the privileged role read with the ordinary profile row read and
//! validates the result. Any failure yields no profile at all.

use std::sync::Arc;

use tracing::{debug, warn};

use amparo_domain::{AuthorizationProfile, IdentityId};

use crate::ports::ProfileStore;

/// Resolves the authorization profile of an identity.
#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn ProfileStore>,
}

impl ProfileResolver {
    /// Creates a resolver reading from the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Fetches and validates the profile of `id`.
    ///
    /// Returns `None` if the role cannot be read, the row cannot be read or
    /// does not exist, or the row fails validation. A default role is never
    /// substituted.
    pub async fn fetch_profile(&self, id: IdentityId) -> Option<AuthorizationProfile> {
        let role = match self.store.read_role(id).await {
            Ok(role) => role,
            Err(e) => {
                warn!(identity = %id, error = %e, "failed to read role");
                return None;
            }
        };

        let row = match self.store.read_profile(id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                warn!(identity = %id, "identity has no profile row");
                return None;
            }
            Err(e) => {
                warn!(identity = %id, error = %e, "failed to read profile");
                return None;
            }
        };

        match AuthorizationProfile::assemble(id, role, row) {
            Ok(profile) => {
                debug!(identity = %id, role = %role, "profile resolved");
                Some(profile)
            }
            Err(e) => {
                warn!(identity = %id, error = %e, "rejected malformed profile row");
                None
            }
        }
    }
}
