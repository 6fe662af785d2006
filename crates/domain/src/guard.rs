//! Route guard decisions.

use serde::{Deserialize, Serialize};

/// Safe destination a guard can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    /// The sign-in page.
    Login,
    /// The authenticated landing page.
    Home,
}

/// Outcome of evaluating a guard against the synchronizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "target")]
pub enum GuardDecision {
    /// Not enough information yet; render a waiting indicator.
    #[default]
    Checking,
    /// Render the protected page.
    Allow,
    /// Navigate away.
    Redirect(RouteTarget),
}

impl GuardDecision {
    /// Returns true if the guard has settled on a final answer.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Checking)
    }

    /// Returns true if access was granted.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Redirect target, if any.
    #[must_use]
    pub const fn redirect_target(self) -> Option<RouteTarget> {
        match self {
            Self::Redirect(target) => Some(target),
            Self::Checking | Self::Allow => None,
        }
    }
}
