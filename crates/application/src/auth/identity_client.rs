//! Identity client facade.
//!
//! Thin wrapper over the [`IdentityProvider`] port that converts provider
//! errors into tagged [`AuthFailure`]s, logs outcomes, and turns the raw
//! broadcast receiver into a subscription that starts with the current
//! session.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use amparo_domain::{AuthFailure, RecoveryLink, Role, Session};

use crate::ports::{IdentityProvider, SessionEvents, SignUpMetadata, SignUpOutcome};

/// Facade over the external identity provider.
#[derive(Clone)]
pub struct IdentityClient {
    provider: Arc<dyn IdentityProvider>,
}

impl IdentityClient {
    /// Creates a facade over the given provider.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Signs in with an e-mail address and password.
    ///
    /// The resulting session is delivered through [`IdentityClient::subscribe`];
    /// it may not be visible yet when this returns.
    ///
    /// # Errors
    /// Returns the tagged failure reported by the provider.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthFailure> {
        self.provider
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| log_failure("sign_in", e.into()))?;
        info!("sign-in accepted");
        Ok(())
    }

    /// Creates an account with the given display name and role.
    ///
    /// # Errors
    /// Returns the tagged failure reported by the provider.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: Role,
    ) -> Result<SignUpOutcome, AuthFailure> {
        let metadata = SignUpMetadata {
            display_name: display_name.trim().to_string(),
            role,
        };
        let outcome = self
            .provider
            .sign_up(email, password, &metadata)
            .await
            .map_err(|e| log_failure("sign_up", e.into()))?;
        info!(role = %role, outcome = ?outcome, "sign-up accepted");
        Ok(outcome)
    }

    /// Ends the current session.
    ///
    /// # Errors
    /// Returns the tagged failure reported by the provider. The provider
    /// still drops its local session in that case.
    pub async fn sign_out(&self) -> Result<(), AuthFailure> {
        self.provider
            .sign_out()
            .await
            .map_err(|e| log_failure("sign_out", e.into()))?;
        info!("signed out");
        Ok(())
    }

    /// Subscribes to session changes.
    ///
    /// The live receiver is installed before the current session is read, so
    /// no change between the two is lost. The first item of the subscription
    /// is that current session.
    pub async fn subscribe(&self) -> SessionSubscription {
        let receiver = self.provider.subscribe();
        let current = self.provider.current_session().await;
        debug!(authenticated = current.is_some(), "session subscription installed");
        SessionSubscription {
            initial: Some(current),
            receiver,
        }
    }

    /// Point-in-time read of the current session.
    pub async fn current_session(&self) -> Option<Session> {
        self.provider.current_session().await
    }

    /// Asks the provider to mail a password-reset link.
    ///
    /// # Errors
    /// Returns the tagged failure reported by the provider.
    pub async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), AuthFailure> {
        self.provider
            .request_password_reset(email, redirect_url)
            .await
            .map_err(|e| log_failure("request_password_reset", e.into()))
    }

    /// Sets a new password inside a recovery session.
    ///
    /// # Errors
    /// Returns `AuthFailure::InvalidRecoveryLink` if the provider refuses the
    /// recovery token, or the tagged failure it reported otherwise.
    pub async fn update_password(
        &self,
        recovery: &RecoveryLink,
        new_password: &str,
    ) -> Result<(), AuthFailure> {
        self.provider
            .update_password(recovery, new_password)
            .await
            .map_err(|e| {
                let failure = match AuthFailure::from(e) {
                    AuthFailure::NoSession | AuthFailure::InvalidCredentials => {
                        AuthFailure::InvalidRecoveryLink
                    }
                    AuthFailure::Rejected { code }
                        if matches!(code.as_str(), "bad_jwt" | "session_not_found" | "otp_expired") =>
                    {
                        AuthFailure::InvalidRecoveryLink
                    }
                    other => other,
                };
                log_failure("update_password", failure)
            })?;
        info!("password updated through recovery link");
        Ok(())
    }
}

fn log_failure(operation: &'static str, failure: AuthFailure) -> AuthFailure {
    warn!(operation, error = %failure, "identity provider call failed");
    failure
}

/// Ordered stream of session changes.
///
/// Yields the session current at subscription time first, then every change
/// in the order the provider emitted it. Dropping the subscription
/// unsubscribes.
pub struct SessionSubscription {
    initial: Option<Option<Session>>,
    receiver: SessionEvents,
}

impl SessionSubscription {
    /// Waits for the next session change.
    ///
    /// Returns `None` once the provider is gone. A subscriber that fell
    /// behind skips the missed changes and continues with the oldest one
    /// still buffered.
    pub async fn next(&mut self) -> Option<Option<Session>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.receiver.recv().await {
                Ok(session) => return Some(session),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session subscriber lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
