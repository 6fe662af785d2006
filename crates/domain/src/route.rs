//! Per-path access policies.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Who may open a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "access", content = "roles")]
pub enum AccessPolicy {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in user, with or without a role.
    Authenticated,
    /// Signed-in users whose role is in the allow-list.
    Roles(Vec<Role>),
}

/// A path pattern such as `/case/:caseId` and its policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Slash-separated pattern; segments starting with `:` match any value.
    pub pattern: String,
    /// Policy applied to matching paths.
    pub policy: AccessPolicy,
}

impl RouteRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(pattern: impl Into<String>, policy: AccessPolicy) -> Self {
        Self {
            pattern: pattern.into(),
            policy,
        }
    }

    /// Returns true if `path` matches this rule's pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut expected = segments(&self.pattern);
        let mut actual = segments(path);
        loop {
            match (expected.next(), actual.next()) {
                (None, None) => return true,
                (Some(e), Some(a)) if e.starts_with(':') || e == a => {}
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Ordered list of route rules; the first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule.
    #[must_use]
    pub fn with(mut self, pattern: impl Into<String>, policy: AccessPolicy) -> Self {
        self.rules.push(RouteRule::new(pattern, policy));
        self
    }

    /// The product's page table.
    #[must_use]
    pub fn default_table() -> Self {
        Self::new()
            .with("/", AccessPolicy::Public)
            .with("/login", AccessPolicy::Public)
            .with("/forgot-password", AccessPolicy::Public)
            .with("/reset-password", AccessPolicy::Public)
            .with("/register", AccessPolicy::Roles(vec![Role::Admin]))
            .with(
                "/followups",
                AccessPolicy::Roles(vec![Role::SocialAssistance, Role::Admin]),
            )
            .with("/dashboard", AccessPolicy::Authenticated)
            .with("/register-person", AccessPolicy::Authenticated)
            .with("/register-case", AccessPolicy::Authenticated)
            .with("/case/:caseId", AccessPolicy::Authenticated)
            .with("/alerts", AccessPolicy::Authenticated)
            .with("/search", AccessPolicy::Authenticated)
            .with("/profile", AccessPolicy::Authenticated)
            .with("/settings", AccessPolicy::Authenticated)
    }

    /// Policy of the first rule matching `path`.
    ///
    /// Paths no rule matches are public (the not-found page).
    #[must_use]
    pub fn policy_for(&self, path: &str) -> &AccessPolicy {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map_or(&AccessPolicy::Public, |rule| &rule.policy)
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}
