//! Identity identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stable external identifier of an authenticated user.
///
/// Issued by the identity provider and shared one-to-one with the
/// authorization profile row in the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for IdentityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::InvalidIdentifier(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity_id() {
        let id: IdentityId = "6f1c2a9e-3b4d-4c5e-8f70-112233445566".parse().unwrap();
        assert_eq!(id.to_string(), "6f1c2a9e-3b4d-4c5e-8f70-112233445566");
    }

    #[test]
    fn test_parse_identity_id_rejects_garbage() {
        let result = "not-a-uuid".parse::<IdentityId>();
        assert_eq!(
            result,
            Err(DomainError::InvalidIdentifier("not-a-uuid".to_string()))
        );
    }

    #[test]
    fn test_generate_identity_id_uniqueness() {
        assert_ne!(IdentityId::generate(), IdentityId::generate());
    }

    #[test]
    fn test_identity_id_serializes_as_plain_string() {
        let id: IdentityId = "6f1c2a9e-3b4d-4c5e-8f70-112233445566".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"6f1c2a9e-3b4d-4c5e-8f70-112233445566\"");
    }
}
