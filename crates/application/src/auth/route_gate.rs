//! Path-level access control.

use amparo_domain::{AccessPolicy, GuardDecision, RouteTable, RouteTarget};
use tracing::debug;

use super::{AuthenticatedGuard, RoleGuard, RouteGuard, Synchronizer};

/// Where navigation to a path ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Render the requested page.
    Render,
    /// Go to this path instead.
    Redirect(String),
}

/// Resolves paths through a [`RouteTable`] and runs the matching guard.
#[derive(Clone)]
pub struct RouteGate {
    sync: Synchronizer,
    table: RouteTable,
}

impl RouteGate {
    /// Creates a gate over the given table.
    #[must_use]
    pub const fn new(sync: Synchronizer, table: RouteTable) -> Self {
        Self { sync, table }
    }

    /// Creates a gate over the product's default page table.
    #[must_use]
    pub fn with_default_table(sync: Synchronizer) -> Self {
        Self::new(sync, RouteTable::default_table())
    }

    /// Runs the guard protecting `path`.
    pub async fn check(&self, path: &str) -> GuardDecision {
        let decision = match self.table.policy_for(path) {
            AccessPolicy::Public => GuardDecision::Allow,
            AccessPolicy::Authenticated => AuthenticatedGuard::new(self.sync.clone()).check().await,
            AccessPolicy::Roles(allow_list) => {
                RoleGuard::new(self.sync.clone(), allow_list.clone())
                    .check()
                    .await
            }
        };
        debug!(path, ?decision, "route checked");
        decision
    }

    /// Runs the guard protecting `path` and maps the decision to a destination.
    ///
    /// Never returns while the guard is still checking.
    pub async fn navigate(&self, path: &str) -> Navigation {
        let decision = self.check(path).await;
        self.destination(decision)
    }

    /// Destination for a decision. An unsettled decision goes to the login page.
    fn destination(&self, decision: GuardDecision) -> Navigation {
        let target = match decision {
            GuardDecision::Allow => return Navigation::Render,
            GuardDecision::Redirect(target) => target,
            GuardDecision::Checking => RouteTarget::Login,
        };
        Navigation::Redirect(self.sync.settings().path_for(target).to_string())
    }
}
