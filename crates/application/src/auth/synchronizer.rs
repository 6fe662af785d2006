//! Session/profile synchronizer.
//!
//! The synchronizer owns the single authoritative [`SynchronizerState`]. It
//! listens to the identity provider's session changes in order, resolves the
//! authorization profile of whoever is signed in, and publishes every change
//! through a `watch` channel. Guards and pages only ever read snapshots.
//!
//! Profile fetches run on spawned tasks and are committed only if the
//! identity they were issued for is still current ("fire and check").

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use amparo_domain::{
    AuthFailure, AuthorizationProfile, CommitOutcome, IdentityId, Notice, ProfilePatch, Role,
    Session, SessionTransition, SyncSettings, SynchronizerState,
};

use super::{IdentityClient, ProfileResolver, SessionSubscription};
use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::{Notifier, ProfileStore, SignUpOutcome};

/// Result of [`Synchronizer::refresh_profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nobody is signed in; nothing was fetched.
    NoSession,
    /// Another refresh is running; this call did nothing.
    AlreadyInFlight,
    /// A fresh profile was committed.
    Refreshed,
    /// The fetch produced no profile; existing data was kept.
    Unavailable,
    /// The identity changed while fetching; the result was discarded.
    Stale,
}

/// Handle to the session/profile synchronizer.
///
/// Cheap to clone; all clones share the same state. The listener task stops
/// when [`Synchronizer::shutdown`] is called or the last handle is dropped.
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

struct Inner {
    identity: IdentityClient,
    resolver: ProfileResolver,
    store: Arc<dyn ProfileStore>,
    notifier: Arc<dyn Notifier>,
    settings: SyncSettings,
    state: watch::Sender<SynchronizerState>,
    refresh_in_flight: AtomicBool,
    /// Bumped by every local profile edit. Fetches started under an older
    /// generation read the store before the edit and are not committed.
    profile_generation: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Synchronizer {
    /// Starts synchronizing with the identity provider.
    ///
    /// The session subscription is installed before the current session is
    /// read. The current session is applied before this returns; later
    /// changes are processed in order by a background listener.
    pub async fn start(
        identity: IdentityClient,
        resolver: ProfileResolver,
        store: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        settings: SyncSettings,
    ) -> Self {
        let (state, _) = watch::channel(SynchronizerState::loading());
        let inner = Arc::new(Inner {
            identity,
            resolver,
            store,
            notifier,
            settings,
            state,
            refresh_in_flight: AtomicBool::new(false),
            profile_generation: AtomicU64::new(0),
            listener: Mutex::new(None),
        });

        let mut subscription = inner.identity.subscribe().await;
        if let Some(current) = subscription.next().await {
            inner.handle_session(current);
        }

        let listener = tokio::spawn(listen(Arc::downgrade(&inner), subscription));
        if let Ok(mut slot) = inner.listener.lock() {
            *slot = Some(listener);
        }

        Self { inner }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SynchronizerState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SynchronizerState> {
        self.inner.state.subscribe()
    }

    /// Settings this synchronizer was started with.
    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    /// Notice sink shared with the guards.
    #[must_use]
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    /// Identity facade used by this synchronizer.
    #[must_use]
    pub fn identity_client(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Signs in. The session arrives through the listener.
    ///
    /// # Errors
    /// Returns the tagged failure reported by the provider.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthFailure> {
        self.inner.identity.sign_in(email, password).await?;
        self.inner.notifier.notify(Notice::signed_in());
        Ok(())
    }

    /// Creates an account, using the configured default role when none is given.
    ///
    /// # Errors
    /// Returns the tagged failure reported by the provider.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: Option<Role>,
    ) -> Result<SignUpOutcome, AuthFailure> {
        let role = role.unwrap_or(self.inner.settings.default_signup_role);
        let outcome = self
            .inner
            .identity
            .sign_up(email, password, display_name, role)
            .await?;
        if outcome == SignUpOutcome::PendingConfirmation {
            self.inner.notifier.notify(Notice::signed_up());
        }
        Ok(outcome)
    }

    /// Signs out and resets the local state as soon as the provider returns.
    ///
    /// # Errors
    /// Returns the tagged failure reported by the provider; the local state
    /// is reset regardless.
    pub async fn sign_out(&self) -> Result<(), AuthFailure> {
        let result = self.inner.identity.sign_out().await;
        self.inner.handle_session(None);
        if result.is_ok() {
            self.inner.notifier.notify(Notice::signed_out());
        }
        result
    }

    /// Re-fetches the profile of the current identity.
    ///
    /// Does nothing when nobody is signed in or when a refresh is already
    /// running; the call is not queued.
    pub async fn refresh_profile(&self) -> RefreshOutcome {
        let Some(id) = self.inner.state.borrow().identity_id() else {
            return RefreshOutcome::NoSession;
        };
        let Some(_refreshing) = RefreshGuard::engage(&self.inner) else {
            debug!(identity = %id, "profile refresh already in flight");
            return RefreshOutcome::AlreadyInFlight;
        };

        let generation = self.inner.profile_generation.load(Ordering::Acquire);
        let profile = self.inner.resolver.fetch_profile(id).await;
        match self.inner.commit(id, generation, profile) {
            CommitOutcome::Committed => RefreshOutcome::Refreshed,
            CommitOutcome::Unavailable => RefreshOutcome::Unavailable,
            CommitOutcome::Stale => RefreshOutcome::Stale,
        }
    }

    /// Updates the editable profile fields.
    ///
    /// The patch is merged into the local profile immediately, then sent to
    /// the store. On success the profile is refreshed from the store; on
    /// failure the merge is rolled back and an error notice is emitted.
    ///
    /// # Errors
    /// Returns an error if the patch is invalid, nobody is signed in, the
    /// current identity has no profile, or the store rejects the update.
    pub async fn update_profile(&self, patch: ProfilePatch) -> ApplicationResult<()> {
        patch.validate()?;
        let (id, previous) = {
            let state = self.inner.state.borrow();
            let id = state.identity_id().ok_or(ApplicationError::NoSession)?;
            let previous = state
                .profile
                .clone()
                .ok_or(ApplicationError::ProfileUnavailable)?;
            (id, previous)
        };
        if patch.is_empty() {
            return Ok(());
        }

        let merged = patch.apply_to(&previous);
        let generation = &self.inner.profile_generation;
        self.inner.state.send_if_modified(|state| {
            generation.fetch_add(1, Ordering::AcqRel);
            state.replace_profile(id, merged.clone())
        });

        match self.inner.store.update_profile(id, &patch).await {
            Ok(()) => {
                info!(identity = %id, "profile updated");
                self.inner.notifier.notify(Notice::profile_updated());
                self.reconcile().await;
                Ok(())
            }
            Err(e) => {
                warn!(identity = %id, error = %e, "profile update failed, rolling back");
                self.inner.rollback(id, &merged, previous);
                self.inner.notifier.notify(Notice::profile_update_failed());
                Err(e.into())
            }
        }
    }

    /// Refreshes after a local edit. A refresh already running started before
    /// the edit, so wait for it to finish and fetch again.
    async fn reconcile(&self) {
        let mut rx = self.inner.state.subscribe();
        loop {
            let outcome = self.refresh_profile().await;
            if outcome != RefreshOutcome::AlreadyInFlight {
                debug!(?outcome, "profile reconciled after update");
                return;
            }
            if rx.wait_for(|state| !state.is_refreshing).await.is_err() {
                return;
            }
        }
    }

    /// Stops listening to session changes.
    pub fn shutdown(&self) {
        self.inner.stop_listener();
    }
}

impl Inner {
    fn handle_session(self: &Arc<Self>, session: Option<Session>) {
        let mut transition = SessionTransition::Cleared;
        self.state.send_modify(|state| transition = state.apply_session(session));

        match transition {
            SessionTransition::IdentityChanged(id) => debug!(identity = %id, "identity changed"),
            SessionTransition::SessionRenewed(id) => debug!(identity = %id, "session renewed"),
            SessionTransition::Cleared => debug!("session cleared"),
        }

        if let Some(id) = transition.fetch_target() {
            self.schedule_fetch(id);
        }
    }

    /// Resolves the profile on a separate task, after the event handler returned.
    fn schedule_fetch(self: &Arc<Self>, id: IdentityId) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let generation = inner.profile_generation.load(Ordering::Acquire);
            let profile = inner.resolver.fetch_profile(id).await;
            inner.commit(id, generation, profile);
        });
    }

    fn commit(
        &self,
        id: IdentityId,
        generation: u64,
        profile: Option<AuthorizationProfile>,
    ) -> CommitOutcome {
        let mut outcome = CommitOutcome::Stale;
        self.state.send_if_modified(|state| {
            if self.profile_generation.load(Ordering::Acquire) != generation {
                return false;
            }
            outcome = state.commit_profile(id, profile);
            outcome != CommitOutcome::Stale
        });
        if outcome == CommitOutcome::Stale {
            debug!(identity = %id, "discarded profile fetched before a newer change");
        }
        outcome
    }

    /// Restores `previous` unless something else replaced the merged profile meanwhile.
    fn rollback(&self, id: IdentityId, merged: &AuthorizationProfile, previous: AuthorizationProfile) {
        self.state.send_if_modified(|state| {
            state.profile.as_ref() == Some(merged) && state.replace_profile(id, previous)
        });
    }

    fn stop_listener(&self) {
        if let Ok(mut slot) = self.listener.lock()
            && let Some(listener) = slot.take()
        {
            listener.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(slot) = self.listener.get_mut()
            && let Some(listener) = slot.take()
        {
            listener.abort();
        }
    }
}

async fn listen(weak: Weak<Inner>, mut subscription: SessionSubscription) {
    while let Some(session) = subscription.next().await {
        let Some(inner) = weak.upgrade() else {
            break;
        };
        inner.handle_session(session);
    }
    debug!("session listener stopped");
}

/// Holds the refresh slot. Dropping it, even on cancellation, frees the slot.
struct RefreshGuard<'a> {
    inner: &'a Inner,
}

impl<'a> RefreshGuard<'a> {
    fn engage(inner: &'a Inner) -> Option<Self> {
        inner
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        inner.state.send_modify(|state| state.is_refreshing = true);
        Some(Self { inner })
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let flag = &self.inner.refresh_in_flight;
        self.inner.state.send_modify(|state| {
            state.is_refreshing = false;
            flag.store(false, Ordering::Release);
        });
    }
}
