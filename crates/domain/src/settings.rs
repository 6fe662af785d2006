//! Synchronizer and guard settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::guard::RouteTarget;
use crate::role::Role;

/// Tunables for the session/profile synchronizer and the route guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Longest a guard may stay in Checking before it settles (milliseconds).
    #[serde(default = "default_guard_timeout_ms")]
    pub guard_timeout_ms: u64,

    /// Authenticated landing page, the target of `RouteTarget::Home`.
    #[serde(default = "default_home_route")]
    pub home_route: String,

    /// Sign-in page, the target of `RouteTarget::Login`.
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// Page the password-reset mail links back to.
    #[serde(default = "default_password_reset_redirect")]
    pub password_reset_redirect: String,

    /// Role requested at sign-up when the caller does not pick one.
    #[serde(default)]
    pub default_signup_role: Role,
}

fn default_guard_timeout_ms() -> u64 {
    10_000
}

fn default_home_route() -> String {
    "/dashboard".to_string()
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_password_reset_redirect() -> String {
    "/reset-password".to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            guard_timeout_ms: default_guard_timeout_ms(),
            home_route: default_home_route(),
            login_route: default_login_route(),
            password_reset_redirect: default_password_reset_redirect(),
            default_signup_role: Role::default(),
        }
    }
}

impl SyncSettings {
    /// Guard timeout as a `Duration`.
    #[must_use]
    pub const fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }

    /// Concrete path for a redirect target.
    #[must_use]
    pub fn path_for(&self, target: RouteTarget) -> &str {
        match target {
            RouteTarget::Login => &self.login_route,
            RouteTarget::Home => &self.home_route,
        }
    }
}
