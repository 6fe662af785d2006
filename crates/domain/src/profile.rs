//! Authorization profiles.
//!
//! The data store hands back loosely-typed rows. [`AuthorizationProfile::assemble`]
//! is the validation boundary: a row either becomes a complete, typed profile
//! or is rejected. Partial profiles are never exposed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::IdentityId;
use crate::role::Role;

/// Application-level record associated one-to-one with an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationProfile {
    /// Same identifier as the owning identity.
    pub id: IdentityId,
    /// Name shown in the interface.
    pub display_name: String,
    /// Single authorization role.
    pub role: Role,
    /// Institution the staff member works for.
    pub organization: Option<String>,
    /// Contact phone number, unformatted.
    pub contact_phone: Option<String>,
    /// When the profile was created by the external system.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Profile row as returned by the data store, before validation.
///
/// Every field is optional because the store's schema does not enforce them.
/// Unknown columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// Row identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name column.
    #[serde(default)]
    pub name: Option<String>,
    /// Organization column.
    #[serde(default)]
    pub organization: Option<String>,
    /// Phone column.
    #[serde(default)]
    pub phone: Option<String>,
    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Update timestamp (RFC 3339).
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl AuthorizationProfile {
    /// Builds a profile from the role read through the privileged path and
    /// the remaining fields read from the profile row.
    ///
    /// # Errors
    /// Returns `DomainError::MalformedProfile` if the row has no id, belongs
    /// to another identity, has no usable name, or lacks valid timestamps.
    pub fn assemble(id: IdentityId, role: Role, row: ProfileRow) -> DomainResult<Self> {
        let row_id: IdentityId = row
            .id
            .as_deref()
            .ok_or_else(|| DomainError::MalformedProfile("missing id".to_string()))?
            .parse()
            .map_err(|_| DomainError::MalformedProfile("unparseable id".to_string()))?;
        if row_id != id {
            return Err(DomainError::MalformedProfile(
                "row belongs to another identity".to_string(),
            ));
        }

        let display_name = non_blank(row.name)
            .ok_or_else(|| DomainError::MalformedProfile("missing name".to_string()))?;
        let created_at = parse_timestamp("created_at", row.created_at.as_deref())?;
        let updated_at = parse_timestamp("updated_at", row.updated_at.as_deref())?;

        Ok(Self {
            id,
            display_name,
            role,
            organization: non_blank(row.organization),
            contact_phone: non_blank(row.phone),
            created_at,
            updated_at,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_timestamp(field: &str, value: Option<&str>) -> DomainResult<DateTime<Utc>> {
    let value = value.ok_or_else(|| DomainError::MalformedProfile(format!("missing {field}")))?;
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::MalformedProfile(format!("invalid {field}")))
}

/// Partial update of the user-editable profile fields.
///
/// The role is not part of the patch: authorization is only ever changed by
/// the external system, so an optimistic local merge cannot elevate access.
/// Serializes to the data store's column names, omitting untouched fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePatch {
    /// New display name.
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New organization; `Some(None)` clears it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Option<String>>,
    /// New phone; `Some(None)` clears it.
    #[serde(rename = "phone", skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<Option<String>>,
}

impl ProfilePatch {
    /// Sets the display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets or clears the organization.
    #[must_use]
    pub fn organization(mut self, organization: Option<String>) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Sets or clears the contact phone.
    #[must_use]
    pub fn contact_phone(mut self, phone: Option<String>) -> Self {
        self.contact_phone = Some(phone);
        self
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.organization.is_none() && self.contact_phone.is_none()
    }

    /// Checks the patch before it is sent anywhere.
    ///
    /// # Errors
    /// Returns `DomainError::MalformedProfile` if the display name is blank.
    pub fn validate(&self) -> DomainResult<()> {
        if self
            .display_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(DomainError::MalformedProfile("blank name".to_string()));
        }
        Ok(())
    }

    /// Returns a copy of `profile` with the patch merged in.
    #[must_use]
    pub fn apply_to(&self, profile: &AuthorizationProfile) -> AuthorizationProfile {
        let mut merged = profile.clone();
        if let Some(name) = &self.display_name {
            merged.display_name = name.trim().to_string();
        }
        if let Some(organization) = &self.organization {
            merged.organization = non_blank(organization.clone());
        }
        if let Some(phone) = &self.contact_phone {
            merged.contact_phone = non_blank(phone.clone());
        }
        merged
    }
}
