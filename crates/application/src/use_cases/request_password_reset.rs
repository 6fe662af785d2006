//! Request password reset use case

use std::sync::Arc;

use amparo_domain::{AuthFailure, Notice};
use tracing::info;

use crate::auth::{IdentityClient, Synchronizer};
use crate::ports::Notifier;

/// Errors that can occur when requesting a password reset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestPasswordResetError {
    /// The address is blank or obviously not an e-mail address.
    #[error("invalid e-mail address")]
    InvalidEmail,

    /// The identity provider refused the request.
    #[error(transparent)]
    Provider(#[from] AuthFailure),
}

impl RequestPasswordResetError {
    /// Localized message for the form.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Informe um e-mail válido.",
            Self::Provider(failure) => failure.user_message(),
        }
    }
}

/// Sends a password-reset mail linking back to the reset page.
pub struct RequestPasswordReset {
    identity: IdentityClient,
    notifier: Arc<dyn Notifier>,
    redirect_to: String,
}

impl RequestPasswordReset {
    /// Creates a new `RequestPasswordReset` use case.
    #[must_use]
    pub fn new(
        identity: IdentityClient,
        notifier: Arc<dyn Notifier>,
        redirect_to: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            notifier,
            redirect_to: redirect_to.into(),
        }
    }

    /// Creates the use case from a running synchronizer's collaborators and settings.
    #[must_use]
    pub fn from_synchronizer(sync: &Synchronizer) -> Self {
        Self::new(
            sync.identity_client().clone(),
            Arc::clone(sync.notifier()),
            sync.settings().password_reset_redirect.clone(),
        )
    }

    /// Executes the use case.
    ///
    /// # Arguments
    /// * `email` - Address of the account to recover
    ///
    /// # Errors
    /// Returns an error if the address is invalid or the provider refuses.
    pub async fn execute(&self, email: &str) -> Result<(), RequestPasswordResetError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(RequestPasswordResetError::InvalidEmail);
        }

        match self
            .identity
            .request_password_reset(email, &self.redirect_to)
            .await
        {
            Ok(()) => {
                info!("password reset mail requested");
                self.notifier.notify(Notice::password_reset_sent());
                Ok(())
            }
            Err(failure) => {
                self.notifier.notify(Notice::from_failure(&failure));
                Err(failure.into())
            }
        }
    }
}
