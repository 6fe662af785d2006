//! Wiring of the backend adapters into a running synchronizer.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use amparo_application::ports::{Clock, IdentityProvider, Notifier};
use amparo_application::use_cases::{CompletePasswordReset, RequestPasswordReset};
use amparo_application::{IdentityClient, ProfileResolver, RouteGate, Synchronizer};
use amparo_domain::{RouteTable, Session};

use crate::adapters::SystemClock;
use crate::config::{AppConfig, ConfigError};
use crate::supabase::{BackendClient, BackendError, GoTrueIdentityProvider, PostgrestProfileStore};

/// Errors raised while assembling the runtime.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration was unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Everything a front end needs: the synchronizer, the provider that owns
/// the session, and the password recovery use cases.
pub struct AmparoRuntime {
    synchronizer: Synchronizer,
    provider: Arc<GoTrueIdentityProvider>,
    notifier: Arc<dyn Notifier>,
    password_reset_redirect: String,
}

impl AmparoRuntime {
    /// Connects to the configured backend and starts the synchronizer.
    ///
    /// `restored` is a session persisted by a previous run, if any. A
    /// restored session that can no longer be renewed is dropped and the
    /// runtime starts anonymous.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub async fn connect(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        restored: Option<Session>,
    ) -> Result<Self, BootstrapError> {
        Self::connect_with_clock(config, notifier, restored, Arc::new(SystemClock)).await
    }

    /// [`AmparoRuntime::connect`] with an explicit clock.
    ///
    /// # Errors
    /// See [`AmparoRuntime::connect`].
    pub async fn connect_with_clock(
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        restored: Option<Session>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BootstrapError> {
        config.validate()?;
        let password_reset_redirect = config.password_reset_redirect()?;
        let backend = BackendClient::new(&config.backend)?;

        let provider = Arc::new(GoTrueIdentityProvider::new(backend.clone(), clock));
        if let Some(session) = restored
            && let Err(e) = provider.restore_session(session).await
        {
            info!(error = %e, "discarding stored session");
        }

        let store = Arc::new(PostgrestProfileStore::new(backend, provider.clone()));
        let synchronizer = Synchronizer::start(
            IdentityClient::new(provider.clone()),
            ProfileResolver::new(store.clone()),
            store,
            notifier.clone(),
            config.sync.clone(),
        )
        .await;
        info!(backend = %config.backend.url, "session synchronizer started");

        Ok(Self {
            synchronizer,
            provider,
            notifier,
            password_reset_redirect,
        })
    }

    /// The running synchronizer.
    #[must_use]
    pub const fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    /// Route gate over the default route table.
    #[must_use]
    pub fn route_gate(&self) -> RouteGate {
        RouteGate::new(self.synchronizer.clone(), RouteTable::default_table())
    }

    /// Current session, for persisting across restarts.
    pub async fn session(&self) -> Option<Session> {
        self.provider.current_session().await
    }

    /// Use case behind the "forgot password" form.
    #[must_use]
    pub fn request_password_reset(&self) -> RequestPasswordReset {
        RequestPasswordReset::new(
            IdentityClient::new(self.provider.clone()),
            self.notifier.clone(),
            self.password_reset_redirect.clone(),
        )
    }

    /// Use case behind the "reset password" page.
    #[must_use]
    pub fn complete_password_reset(&self) -> CompletePasswordReset {
        CompletePasswordReset::new(
            IdentityClient::new(self.provider.clone()),
            self.notifier.clone(),
        )
    }

    /// Stops the synchronizer's background listener.
    pub fn shutdown(&self) {
        self.synchronizer.shutdown();
    }
}
