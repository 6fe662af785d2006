//! Authorization roles.
//!
//! A profile carries exactly one role. Authorization checks are membership
//! tests against an allow-list, never permission bitmasks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The closed set of roles a staff profile can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Hospital staff (default for self sign-up).
    #[default]
    Hospital,
    /// Social assistance staff.
    SocialAssistance,
    /// Police staff.
    Police,
    /// System administrator.
    Admin,
    /// Tutelar council member.
    TutelarCouncil,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Hospital,
        Self::SocialAssistance,
        Self::Police,
        Self::Admin,
        Self::TutelarCouncil,
    ];

    /// Wire name used by the data store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::SocialAssistance => "social_assistance",
            Self::Police => "police",
            Self::Admin => "admin",
            Self::TutelarCouncil => "tutelar_council",
        }
    }

    /// Returns true if this role appears in the allow-list.
    ///
    /// An empty allow-list admits nobody.
    #[must_use]
    pub fn is_allowed_by(self, allow_list: &[Self]) -> bool {
        allow_list.contains(&self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| DomainError::InvalidRole(s.to_string()))
    }
}
