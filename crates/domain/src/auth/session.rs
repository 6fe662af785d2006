//! Provider-issued sessions and the identities derived from them.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::IdentityId;

/// The authenticated user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable external identifier.
    pub id: IdentityId,
    /// Contact address, if the provider exposes one.
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    /// Creates an identity.
    #[must_use]
    pub const fn new(id: IdentityId, email: Option<String>) -> Self {
        Self { id, email }
    }
}

/// Credential bundle issued by the identity provider.
///
/// Sessions are replaced wholesale on every auth event and never mutated
/// field by field. Token values are redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token presented to the data store.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// Token type (usually "bearer").
    pub token_type: String,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
    /// Identity the session proves.
    pub identity: Identity,
}

impl Session {
    /// Creates a session that expires `expires_in_secs` after `issued_at`.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidLifetime` if the expiry falls outside the
    /// representable time range.
    pub fn issued(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
        identity: Identity,
    ) -> DomainResult<Self> {
        let expires_at = Duration::try_seconds(expires_in_secs)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or(DomainError::InvalidLifetime(expires_in_secs))?;
        Ok(Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: "bearer".to_string(),
            expires_at,
            identity,
        })
    }

    /// Identifier of the identity this session proves.
    #[must_use]
    pub const fn identity_id(&self) -> IdentityId {
        self.identity.id
    }

    /// Check if the session validity window has closed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if the session expires within the given buffer.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now + buffer >= self.expires_at
    }

    /// Returns the Authorization header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session_at(now: DateTime<Utc>) -> Session {
        Session::issued(
            "access-abc",
            "refresh-xyz",
            now,
            3600,
            Identity::new(IdentityId::generate(), Some("ana@example.org".to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_out_of_range_lifetime_is_rejected() {
        let identity = Identity::new(IdentityId::generate(), None);
        let result = Session::issued("a", "r", Utc::now(), i64::MAX, identity.clone());
        assert_eq!(result, Err(DomainError::InvalidLifetime(i64::MAX)));

        let result = Session::issued("a", "r", Utc::now(), i64::MIN, identity);
        assert_eq!(result, Err(DomainError::InvalidLifetime(i64::MIN)));
    }

    #[test]
    fn test_session_expiry_window() {
        let now = Utc::now();
        let session = session_at(now);

        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::seconds(3600)));
        assert!(!session.expires_within(now, Duration::seconds(60)));
        assert!(session.expires_within(now + Duration::seconds(3550), Duration::seconds(60)));
    }

    #[test]
    fn test_session_debug_redacts_tokens() {
        let session = session_at(Utc::now());
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("access-abc"));
        assert!(!rendered.contains("refresh-xyz"));
        assert!(rendered.contains("ana@example.org"));
    }

    #[test]
    fn test_authorization_header() {
        let session = session_at(Utc::now());
        assert_eq!(session.authorization_header(), "Bearer access-abc");
    }
}
