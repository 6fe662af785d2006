//! Complete password reset use case

use std::sync::Arc;

use amparo_domain::{AuthFailure, Notice, RecoveryLink};
use tracing::{info, warn};

use crate::auth::{IdentityClient, Synchronizer};
use crate::ports::Notifier;

/// Shortest password accepted by the reset form.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors that can occur when completing a password reset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletePasswordResetError {
    /// The link lacks the recovery marker or a token.
    #[error("invalid recovery link")]
    InvalidLink,

    /// The new password is too short.
    #[error("password shorter than 6 characters")]
    PasswordTooShort,

    /// The confirmation does not match the new password.
    #[error("password confirmation does not match")]
    PasswordMismatch,

    /// The identity provider refused the update.
    #[error(transparent)]
    Provider(#[from] AuthFailure),
}

impl CompletePasswordResetError {
    /// Localized message for the form.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidLink => AuthFailure::InvalidRecoveryLink.user_message(),
            Self::PasswordTooShort => "A senha deve ter pelo menos 6 caracteres.",
            Self::PasswordMismatch => "As senhas não coincidem.",
            Self::Provider(failure) => failure.user_message(),
        }
    }
}

/// Sets a new password from the recovery context carried by a reset link.
pub struct CompletePasswordReset {
    identity: IdentityClient,
    notifier: Arc<dyn Notifier>,
}

impl CompletePasswordReset {
    /// Creates a new `CompletePasswordReset` use case.
    #[must_use]
    pub fn new(identity: IdentityClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { identity, notifier }
    }

    /// Creates the use case from a running synchronizer's collaborators.
    #[must_use]
    pub fn from_synchronizer(sync: &Synchronizer) -> Self {
        Self::new(sync.identity_client().clone(), Arc::clone(sync.notifier()))
    }

    /// Checks that a reset link can be used, before the form is shown.
    ///
    /// # Errors
    /// Returns `CompletePasswordResetError::InvalidLink` and emits a notice
    /// if the fragment is not a recovery link.
    pub fn inspect(&self, fragment: &str) -> Result<RecoveryLink, CompletePasswordResetError> {
        RecoveryLink::from_fragment(fragment).map_err(|e| {
            warn!(error = %e, "rejected password recovery link");
            self.notifier.notify(Notice::invalid_recovery_link());
            CompletePasswordResetError::InvalidLink
        })
    }

    /// Executes the use case.
    ///
    /// # Arguments
    /// * `fragment` - URL fragment of the reset link
    /// * `new_password` - Password to set
    /// * `confirmation` - Password typed a second time
    ///
    /// # Errors
    /// Returns an error if the link is invalid, the password is rejected
    /// locally, or the provider refuses the update.
    pub async fn execute(
        &self,
        fragment: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), CompletePasswordResetError> {
        let link = self.inspect(fragment)?;
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CompletePasswordResetError::PasswordTooShort);
        }
        if new_password != confirmation {
            return Err(CompletePasswordResetError::PasswordMismatch);
        }

        match self.identity.update_password(&link, new_password).await {
            Ok(()) => {
                info!("password reset completed");
                self.notifier.notify(Notice::password_updated());
                Ok(())
            }
            Err(failure) => {
                self.notifier.notify(Notice::from_failure(&failure));
                Err(failure.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{FakeIdentityProvider, RecordingNotifier};
    use amparo_domain::NoticeKind;
    use pretty_assertions::assert_eq;

    const LINK: &str = "#access_token=recovery-token&refresh_token=r&type=recovery";

    fn use_case() -> (
        CompletePasswordReset,
        Arc<FakeIdentityProvider>,
        Arc<RecordingNotifier>,
    ) {
        let provider = Arc::new(FakeIdentityProvider::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let use_case =
            CompletePasswordReset::new(IdentityClient::new(provider.clone()), notifier.clone());
        (use_case, provider, notifier)
    }

    #[tokio::test]
    async fn test_reset_updates_password_with_recovery_token() {
        let (use_case, provider, notifier) = use_case();

        use_case.execute(LINK, "novasenha", "novasenha").await.unwrap();

        assert_eq!(
            provider.password_updates.lock().unwrap().clone(),
            vec![("recovery-token".to_string(), "novasenha".to_string())]
        );
        assert_eq!(notifier.count(NoticeKind::Success), 1);
    }

    #[tokio::test]
    async fn test_link_without_recovery_marker_is_rejected() {
        let (use_case, provider, notifier) = use_case();

        let result = use_case
            .execute("#access_token=t&type=signup", "novasenha", "novasenha")
            .await;

        assert_eq!(result, Err(CompletePasswordResetError::InvalidLink));
        assert!(provider.password_updates.lock().unwrap().is_empty());
        assert_eq!(notifier.count(NoticeKind::Error), 1);
    }

    #[tokio::test]
    async fn test_password_rules_are_checked_locally() {
        let (use_case, provider, _) = use_case();

        assert_eq!(
            use_case.execute(LINK, "12345", "12345").await,
            Err(CompletePasswordResetError::PasswordTooShort)
        );
        assert_eq!(
            use_case.execute(LINK, "123456", "654321").await,
            Err(CompletePasswordResetError::PasswordMismatch)
        );
        assert!(provider.password_updates.lock().unwrap().is_empty());
    }
}
