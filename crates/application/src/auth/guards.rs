//! Route authorization guards.
//!
//! Guards are read-only consumers of the synchronizer state. A check waits
//! for the first profile load, triggers at most one profile refresh, and
//! settles within the configured timeout.

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use amparo_domain::{GuardDecision, IdentityId, Notice, Role, RouteTarget, SynchronizerState};

use super::Synchronizer;

/// Common interface of the route guards.
#[async_trait]
pub trait RouteGuard: Send + Sync + 'static {
    /// Synchronizer the guard reads from.
    fn synchronizer(&self) -> &Synchronizer;

    /// Decision for a snapshot, without waiting or side effects.
    ///
    /// Returns `Checking` whenever a full check would still wait or refresh.
    fn evaluate(&self, state: &SynchronizerState) -> GuardDecision;

    /// Runs the full check and returns the settled decision together with
    /// the state snapshot it was made on.
    async fn decide(&self) -> (GuardDecision, SynchronizerState);

    /// Runs the full check and settles on `Allow` or a redirect.
    async fn check(&self) -> GuardDecision {
        self.decide().await.0
    }
}

/// Admits any signed-in user, with or without a role.
#[derive(Clone)]
pub struct AuthenticatedGuard {
    sync: Synchronizer,
}

impl AuthenticatedGuard {
    /// Creates the guard.
    #[must_use]
    pub const fn new(sync: Synchronizer) -> Self {
        Self { sync }
    }

    async fn settle(&self, rx: &mut watch::Receiver<SynchronizerState>) -> Decided {
        if !wait_loaded(rx).await {
            return (GuardDecision::Redirect(RouteTarget::Login), snapshot(rx));
        }
        let loaded = snapshot(rx);
        if !loaded.is_authenticated() {
            return (GuardDecision::Redirect(RouteTarget::Login), loaded);
        }

        self.sync.refresh_profile().await;
        let settled = wait_settled(rx).await;
        let state = snapshot(rx);
        if !settled {
            return (GuardDecision::Redirect(RouteTarget::Login), state);
        }
        (session_decision(&state), state)
    }
}

#[async_trait]
impl RouteGuard for AuthenticatedGuard {
    fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    fn evaluate(&self, state: &SynchronizerState) -> GuardDecision {
        if state.is_loading || state.is_refreshing {
            GuardDecision::Checking
        } else {
            session_decision(state)
        }
    }

    async fn decide(&self) -> Decided {
        let mut rx = self.sync.subscribe();
        let outcome = tokio::time::timeout(
            self.sync.settings().guard_timeout(),
            self.settle(&mut rx),
        )
        .await;

        match outcome {
            Ok(decided) => decided,
            Err(_) => {
                warn!("authenticated guard timed out, deciding on session presence");
                let state = snapshot(&rx);
                (session_decision(&state), state)
            }
        }
    }
}

/// Admits signed-in users whose role is in an allow-list.
#[derive(Clone)]
pub struct RoleGuard {
    sync: Synchronizer,
    allow_list: Vec<Role>,
}

impl RoleGuard {
    /// Creates the guard. An empty allow-list admits nobody.
    #[must_use]
    pub fn new(sync: Synchronizer, allow_list: impl Into<Vec<Role>>) -> Self {
        Self {
            sync,
            allow_list: allow_list.into(),
        }
    }

    /// Roles this guard admits.
    #[must_use]
    pub fn allow_list(&self) -> &[Role] {
        &self.allow_list
    }

    /// Decision once no further refresh will be attempted: a missing role denies.
    fn final_decision(&self, state: &SynchronizerState) -> GuardDecision {
        if !state.is_authenticated() {
            return GuardDecision::Redirect(RouteTarget::Login);
        }
        if state.has_role_in(&self.allow_list) {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(RouteTarget::Home)
        }
    }

    async fn settle(&self, rx: &mut watch::Receiver<SynchronizerState>) -> Decided {
        if !wait_loaded(rx).await {
            return (GuardDecision::Redirect(RouteTarget::Login), snapshot(rx));
        }
        let loaded = snapshot(rx);
        if loaded.is_authenticated() && loaded.current_role().is_none() {
            let outcome = self.sync.refresh_profile().await;
            debug!(?outcome, "role guard refreshed missing role");
        }

        let settled = wait_settled(rx).await;
        let state = snapshot(rx);
        if !settled {
            return (GuardDecision::Redirect(RouteTarget::Login), state);
        }
        (self.final_decision(&state), state)
    }
}

#[async_trait]
impl RouteGuard for RoleGuard {
    fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    fn evaluate(&self, state: &SynchronizerState) -> GuardDecision {
        if state.is_loading || state.is_refreshing {
            return GuardDecision::Checking;
        }
        if state.is_authenticated() && state.current_role().is_none() {
            return GuardDecision::Checking;
        }
        self.final_decision(state)
    }

    async fn decide(&self) -> Decided {
        let mut rx = self.sync.subscribe();
        let outcome = tokio::time::timeout(
            self.sync.settings().guard_timeout(),
            self.settle(&mut rx),
        )
        .await;

        let (decision, decided_on) = match outcome {
            Ok(decided) => decided,
            Err(_) => {
                warn!(allow_list = ?self.allow_list, "role guard timed out, denying access");
                let state = snapshot(&rx);
                let decision = if state.is_authenticated() {
                    GuardDecision::Redirect(RouteTarget::Home)
                } else {
                    GuardDecision::Redirect(RouteTarget::Login)
                };
                (decision, state)
            }
        };

        if decision == GuardDecision::Redirect(RouteTarget::Home) {
            debug!(allow_list = ?self.allow_list, "access denied");
            self.sync.notifier().notify(Notice::access_denied());
        }
        (decision, decided_on)
    }
}

/// A decision and the state snapshot it was made on.
type Decided = (GuardDecision, SynchronizerState);

fn snapshot(rx: &watch::Receiver<SynchronizerState>) -> SynchronizerState {
    rx.borrow().clone()
}

fn session_decision(state: &SynchronizerState) -> GuardDecision {
    if state.is_authenticated() {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect(RouteTarget::Login)
    }
}

/// Waits for the first profile load. Returns false if the synchronizer is gone.
async fn wait_loaded(rx: &mut watch::Receiver<SynchronizerState>) -> bool {
    rx.wait_for(|state| !state.is_loading).await.is_ok()
}

/// Waits until no load or refresh is running. Returns false if the synchronizer is gone.
async fn wait_settled(rx: &mut watch::Receiver<SynchronizerState>) -> bool {
    rx.wait_for(|state| !state.is_loading && !state.is_refreshing)
        .await
        .is_ok()
}

/// Continuously re-evaluated guard decision.
///
/// The guard is re-checked whenever the identity or its role changes, and
/// the decision drops back to `Checking` while it runs, so a decision made
/// for a previous identity is never reused. Dropping the watch stops it.
pub struct GuardWatch {
    decisions: watch::Receiver<GuardDecision>,
    task: JoinHandle<()>,
}

impl GuardWatch {
    /// Starts watching `guard`.
    #[must_use]
    pub fn spawn<G: RouteGuard>(guard: G) -> Self {
        let (tx, decisions) = watch::channel(GuardDecision::Checking);
        let task = tokio::spawn(async move {
            let mut state_rx = guard.synchronizer().subscribe();
            loop {
                tx.send_replace(GuardDecision::Checking);
                let (decision, decided_on) = guard.decide().await;
                let key = access_key(&decided_on);
                if tx.send(decision).is_err() {
                    return;
                }

                // The state may already have moved on since the decision.
                while access_key(&state_rx.borrow_and_update()) == key {
                    if state_rx.changed().await.is_err() {
                        return;
                    }
                }
                debug!("identity or role changed, re-checking guard");
            }
        });
        Self { decisions, task }
    }

    /// Latest decision.
    #[must_use]
    pub fn decision(&self) -> GuardDecision {
        *self.decisions.borrow()
    }

    /// Receiver of decision changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GuardDecision> {
        self.decisions.clone()
    }

    /// Waits for the next settled decision.
    pub async fn settled(&mut self) -> GuardDecision {
        match self.decisions.wait_for(|decision| decision.is_settled()).await {
            Ok(decision) => *decision,
            Err(_) => GuardDecision::Redirect(RouteTarget::Login),
        }
    }
}

impl Drop for GuardWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn access_key(state: &SynchronizerState) -> (Option<IdentityId>, Option<Role>) {
    (state.identity_id(), state.current_role())
}
