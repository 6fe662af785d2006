//! In-memory port implementations for unit tests.

#![allow(clippy::expect_used, clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Semaphore, broadcast};

use amparo_domain::{
    Identity, IdentityId, Notice, NoticeKind, ProfilePatch, ProfileRow, RecoveryLink, Role,
    Session,
};

use crate::ports::{
    IdentityProvider, IdentityProviderError, Notifier, ProfileStore, ProfileStoreError,
    SessionEvents, SignUpMetadata, SignUpOutcome,
};

pub fn session_for(id: IdentityId) -> Session {
    Session::issued(
        format!("access-{id}"),
        format!("refresh-{id}"),
        Utc::now(),
        3600,
        Identity::new(id, Some(format!("{id}@example.org"))),
    )
    .expect("valid lifetime")
}

pub fn profile_row(id: IdentityId, name: &str) -> ProfileRow {
    ProfileRow {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        organization: Some("Hospital Municipal".to_string()),
        phone: None,
        created_at: Some("2024-03-01T12:00:00Z".to_string()),
        updated_at: Some("2024-03-01T12:00:00Z".to_string()),
    }
}

/// Identity provider driven by the test through [`FakeIdentityProvider::emit`].
pub struct FakeIdentityProvider {
    events: broadcast::Sender<Option<Session>>,
    session: Mutex<Option<Session>>,
    accounts: Mutex<HashMap<String, (String, IdentityId)>>,
    fail_next: Mutex<Option<IdentityProviderError>>,
    pub sign_ups: Mutex<Vec<(String, SignUpMetadata)>>,
    pub reset_requests: Mutex<Vec<(String, String)>>,
    pub password_updates: Mutex<Vec<(String, String)>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            session: Mutex::new(None),
            accounts: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(None),
            sign_ups: Mutex::new(Vec::new()),
            reset_requests: Mutex::new(Vec::new()),
            password_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_session(session: Session) -> Self {
        let provider = Self::new();
        *provider.session.lock().expect("Lock poisoned") = Some(session);
        provider
    }

    pub fn add_account(&self, email: &str, password: &str) -> IdentityId {
        let id = IdentityId::generate();
        self.accounts
            .lock()
            .expect("Lock poisoned")
            .insert(email.to_string(), (password.to_string(), id));
        id
    }

    /// Replaces the current session and broadcasts the change.
    pub fn emit(&self, session: Option<Session>) {
        *self.session.lock().expect("Lock poisoned") = session.clone();
        let _ = self.events.send(session);
    }

    pub fn fail_next(&self, error: IdentityProviderError) {
        *self.fail_next.lock().expect("Lock poisoned") = Some(error);
    }

    fn take_failure(&self) -> Result<(), IdentityProviderError> {
        self.fail_next
            .lock()
            .expect("Lock poisoned")
            .take()
            .map_or(Ok(()), Err)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), IdentityProviderError> {
        self.take_failure()?;
        let account = self.accounts.lock().expect("Lock poisoned").get(email).cloned();
        match account {
            Some((expected, id)) if expected == password => {
                self.emit(Some(session_for(id)));
                Ok(())
            }
            _ => Err(IdentityProviderError::Rejected {
                status: 400,
                code: "invalid_credentials".to_string(),
            }),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, IdentityProviderError> {
        self.take_failure()?;
        self.sign_ups
            .lock()
            .expect("Lock poisoned")
            .push((email.to_string(), metadata.clone()));
        Ok(SignUpOutcome::PendingConfirmation)
    }

    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        let result = self.take_failure();
        self.emit(None);
        result
    }

    fn subscribe(&self) -> SessionEvents {
        self.events.subscribe()
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.lock().expect("Lock poisoned").clone()
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityProviderError> {
        self.take_failure()?;
        self.reset_requests
            .lock()
            .expect("Lock poisoned")
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn update_password(
        &self,
        recovery: &RecoveryLink,
        new_password: &str,
    ) -> Result<(), IdentityProviderError> {
        self.take_failure()?;
        self.password_updates
            .lock()
            .expect("Lock poisoned")
            .push((recovery.access_token().to_string(), new_password.to_string()));
        Ok(())
    }
}

/// Profile store with call counters, injectable failures and per-identity gates.
pub struct FakeProfileStore {
    profiles: Mutex<HashMap<IdentityId, (Role, ProfileRow)>>,
    gates: Mutex<HashMap<IdentityId, Arc<Semaphore>>>,
    row_gates: Mutex<HashMap<IdentityId, Arc<Semaphore>>>,
    row_reads: AtomicUsize,
    role_failures: AtomicUsize,
    fail_updates: AtomicBool,
    role_reads: AtomicUsize,
    pub updates: Mutex<Vec<(IdentityId, ProfilePatch)>>,
}

impl FakeProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            row_gates: Mutex::new(HashMap::new()),
            row_reads: AtomicUsize::new(0),
            role_failures: AtomicUsize::new(0),
            fail_updates: AtomicBool::new(false),
            role_reads: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, id: IdentityId, role: Role, name: &str) {
        self.profiles
            .lock()
            .expect("Lock poisoned")
            .insert(id, (role, profile_row(id, name)));
    }

    pub fn set_role(&self, id: IdentityId, role: Role) {
        if let Some(entry) = self.profiles.lock().expect("Lock poisoned").get_mut(&id) {
            entry.0 = role;
        }
    }

    /// Fails the next `count` role reads.
    pub fn fail_role_reads(&self, count: usize) {
        self.role_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Blocks role reads for `id` until [`FakeProfileStore::release`] is called.
    pub fn hold(&self, id: IdentityId) {
        self.gates
            .lock()
            .expect("Lock poisoned")
            .insert(id, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, id: IdentityId) {
        if let Some(gate) = self.gates.lock().expect("Lock poisoned").remove(&id) {
            gate.close();
        }
    }

    /// Blocks profile reads for `id` after they copied the row, until
    /// [`FakeProfileStore::release_rows`] is called.
    pub fn hold_rows(&self, id: IdentityId) {
        self.row_gates
            .lock()
            .expect("Lock poisoned")
            .insert(id, Arc::new(Semaphore::new(0)));
    }

    pub fn release_rows(&self, id: IdentityId) {
        if let Some(gate) = self.row_gates.lock().expect("Lock poisoned").remove(&id) {
            gate.close();
        }
    }

    /// Number of profile row reads that copied a row.
    pub fn row_reads(&self) -> usize {
        self.row_reads.load(Ordering::SeqCst)
    }

    /// Number of role reads so far, i.e. profile fetches started.
    pub fn fetches(&self) -> usize {
        self.role_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn read_role(&self, id: IdentityId) -> Result<Role, ProfileStoreError> {
        self.role_reads.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().expect("Lock poisoned").get(&id).cloned();
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        let failing = self
            .role_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProfileStoreError::Network("connection reset".to_string()));
        }
        self.profiles
            .lock()
            .expect("Lock poisoned")
            .get(&id)
            .map(|(role, _)| *role)
            .ok_or_else(|| ProfileStoreError::InvalidResponse("no role".to_string()))
    }

    async fn read_profile(&self, id: IdentityId) -> Result<Option<ProfileRow>, ProfileStoreError> {
        let row = self
            .profiles
            .lock()
            .expect("Lock poisoned")
            .get(&id)
            .map(|(_, row)| row.clone());
        self.row_reads.fetch_add(1, Ordering::SeqCst);
        let gate = self.row_gates.lock().expect("Lock poisoned").get(&id).cloned();
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: IdentityId,
        patch: &ProfilePatch,
    ) -> Result<(), ProfileStoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Network("timeout".to_string()));
        }
        self.updates
            .lock()
            .expect("Lock poisoned")
            .push((id, patch.clone()));
        if let Some((_, row)) = self.profiles.lock().expect("Lock poisoned").get_mut(&id) {
            if let Some(name) = &patch.display_name {
                row.name = Some(name.clone());
            }
            if let Some(organization) = &patch.organization {
                row.organization.clone_from(organization);
            }
            if let Some(phone) = &patch.contact_phone {
                row.phone.clone_from(phone);
            }
        }
        Ok(())
    }
}

/// Notifier that keeps every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("Lock poisoned").clone()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .expect("Lock poisoned")
            .iter()
            .filter(|notice| notice.kind == kind)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("Lock poisoned").push(notice);
    }
}
