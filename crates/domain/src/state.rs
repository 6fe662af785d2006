//! Session/profile synchronizer state.
//!
//! This module holds the pure state machine: the snapshot type, its
//! invariants, and the transitions applied when session events arrive or
//! profile fetches resolve. Scheduling and I/O live in the application layer.

use crate::auth::{Identity, Session};
use crate::error::{DomainError, DomainResult};
use crate::id::IdentityId;
use crate::profile::AuthorizationProfile;
use crate::role::Role;

/// Authoritative in-memory view of who is logged in, with what role.
///
/// Invariants (see [`SynchronizerState::check_invariants`]):
/// - `identity` is present iff `session` is present;
/// - without a session there is no profile and no role;
/// - a role is present only with a profile carrying that same role;
/// - a profile always belongs to the current identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynchronizerState {
    /// Current provider session.
    pub session: Option<Session>,
    /// Identity derived from the session.
    pub identity: Option<Identity>,
    /// Resolved authorization profile.
    pub profile: Option<AuthorizationProfile>,
    /// Role copied from the profile.
    pub role: Option<Role>,
    /// A profile load for the current identity has not settled yet.
    pub is_loading: bool,
    /// An explicit profile refresh is in flight.
    pub is_refreshing: bool,
}

/// Whether a settled synchronizer has a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A session is present (with or without a role).
    Authenticated,
    /// No session.
    Anonymous,
}

/// Coarse lifecycle phase derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Waiting for the first profile load to settle.
    Loading,
    /// Settled.
    Ready(Readiness),
}

/// What a session event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// A different identity (or the first one) is now current; its profile must be fetched.
    IdentityChanged(IdentityId),
    /// Same identity, new credentials; the profile should be reconciled.
    SessionRenewed(IdentityId),
    /// The session ended and all authorization data was dropped.
    Cleared,
}

impl SessionTransition {
    /// Identity whose profile should be fetched after this transition.
    #[must_use]
    pub const fn fetch_target(self) -> Option<IdentityId> {
        match self {
            Self::IdentityChanged(id) | Self::SessionRenewed(id) => Some(id),
            Self::Cleared => None,
        }
    }
}

/// Result of committing a resolved profile fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The profile and role were written.
    Committed,
    /// The fetch produced no profile; existing authorization data was kept.
    Unavailable,
    /// The fetch was issued for an identity that is no longer current.
    Stale,
}

impl SynchronizerState {
    /// State at synchronizer construction: nothing known, loading.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// Derives the lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SyncPhase {
        if self.is_loading {
            SyncPhase::Loading
        } else if self.session.is_some() {
            SyncPhase::Ready(Readiness::Authenticated)
        } else {
            SyncPhase::Ready(Readiness::Anonymous)
        }
    }

    /// Returns true if a session is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Identifier of the current identity.
    #[must_use]
    pub fn identity_id(&self) -> Option<IdentityId> {
        self.identity.as_ref().map(|identity| identity.id)
    }

    /// Role of the current identity, only if the profile really belongs to it.
    #[must_use]
    pub fn current_role(&self) -> Option<Role> {
        let identity = self.identity_id()?;
        let profile = self.profile.as_ref().filter(|p| p.id == identity)?;
        self.role.filter(|role| *role == profile.role)
    }

    /// Fail-closed allow-list check for the current identity.
    #[must_use]
    pub fn has_role_in(&self, allow_list: &[Role]) -> bool {
        self.current_role()
            .is_some_and(|role| role.is_allowed_by(allow_list))
    }

    /// Verifies the snapshot invariants.
    ///
    /// # Errors
    /// Returns `DomainError::InconsistentState` naming the first violation.
    pub fn check_invariants(&self) -> DomainResult<()> {
        if self.identity.is_some() != self.session.is_some() {
            return Err(DomainError::InconsistentState(
                "identity present iff session present",
            ));
        }
        if self.session.is_none() && (self.profile.is_some() || self.role.is_some()) {
            return Err(DomainError::InconsistentState(
                "authorization data survived without a session",
            ));
        }
        if let Some(role) = self.role
            && self.profile.as_ref().is_none_or(|p| p.role != role)
        {
            return Err(DomainError::InconsistentState(
                "role without a matching profile",
            ));
        }
        if let (Some(profile), Some(identity)) = (&self.profile, &self.identity)
            && profile.id != identity.id
        {
            return Err(DomainError::InconsistentState(
                "profile belongs to another identity",
            ));
        }
        if let (Some(session), Some(identity)) = (&self.session, &self.identity)
            && &session.identity != identity
        {
            return Err(DomainError::InconsistentState(
                "identity not derived from session",
            ));
        }
        Ok(())
    }

    /// Applies a session-change event.
    ///
    /// Session and identity are replaced immediately. When the identity
    /// changes, the previous identity's profile and role are dropped in the
    /// same step so no stale authorization is ever observable.
    pub fn apply_session(&mut self, session: Option<Session>) -> SessionTransition {
        let Some(session) = session else {
            self.session = None;
            self.identity = None;
            self.profile = None;
            self.role = None;
            self.is_loading = false;
            return SessionTransition::Cleared;
        };

        let previous = self.identity_id();
        let next = session.identity_id();
        self.identity = Some(session.identity.clone());
        self.session = Some(session);

        if previous == Some(next) {
            self.is_loading = self.profile.is_none();
            SessionTransition::SessionRenewed(next)
        } else {
            self.profile = None;
            self.role = None;
            self.is_loading = true;
            SessionTransition::IdentityChanged(next)
        }
    }

    /// Commits the result of a profile fetch issued for `issued_for`.
    ///
    /// Results for an identity that is no longer current are discarded. A
    /// missing profile settles loading but keeps whatever profile the current
    /// identity already had; on a first load that leaves the role empty.
    pub fn commit_profile(
        &mut self,
        issued_for: IdentityId,
        profile: Option<AuthorizationProfile>,
    ) -> CommitOutcome {
        if self.identity_id() != Some(issued_for) {
            return CommitOutcome::Stale;
        }
        self.is_loading = false;
        match profile.filter(|p| p.id == issued_for) {
            Some(profile) => {
                self.role = Some(profile.role);
                self.profile = Some(profile);
                CommitOutcome::Committed
            }
            None => CommitOutcome::Unavailable,
        }
    }

    /// Replaces the current identity's profile without a fetch.
    ///
    /// Used for optimistic merges and their rollback. Returns false (and
    /// changes nothing) if `identity` is no longer current.
    pub fn replace_profile(&mut self, identity: IdentityId, profile: AuthorizationProfile) -> bool {
        if self.identity_id() != Some(identity) || profile.id != identity {
            return false;
        }
        self.role = Some(profile.role);
        self.profile = Some(profile);
        true
    }
}
