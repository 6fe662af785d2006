//! Password recovery links.
//!
//! The provider's reset mail points back to the application with the
//! recovery session encoded in the URL fragment, e.g.
//! `#access_token=...&refresh_token=...&expires_in=3600&type=recovery`.

use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Recovery-session context extracted from a reset link.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoveryLink {
    access_token: String,
    refresh_token: Option<String>,
}

impl RecoveryLink {
    /// Parses a URL fragment, with or without the leading `#`.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRecoveryLink` if the fragment is not
    /// urlencoded, carries a provider error, lacks the `type=recovery`
    /// marker, or has no access token.
    pub fn from_fragment(fragment: &str) -> DomainResult<Self> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(fragment)
            .map_err(|e| DomainError::InvalidRecoveryLink(e.to_string()))?;

        let lookup = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        if let Some(error) = lookup("error_code").or_else(|| lookup("error")) {
            return Err(DomainError::InvalidRecoveryLink(error.to_string()));
        }
        if lookup("type") != Some("recovery") {
            return Err(DomainError::InvalidRecoveryLink(
                "missing recovery marker".to_string(),
            ));
        }
        let access_token = lookup("access_token")
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DomainError::InvalidRecoveryLink("missing access token".to_string()))?;

        Ok(Self {
            access_token: access_token.to_string(),
            refresh_token: lookup("refresh_token").map(String::from),
        })
    }

    /// Access token of the recovery session.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Refresh token of the recovery session, when present.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

impl fmt::Debug for RecoveryLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryLink")
            .field("access_token", &"***")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}
