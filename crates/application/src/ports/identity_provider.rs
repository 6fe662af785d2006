//! Identity provider port
//!
//! Defines the interface to the external service that authenticates users
//! and issues sessions.

use async_trait::async_trait;
use tokio::sync::broadcast;

use amparo_domain::{AuthFailure, RecoveryLink, Role, Session};

/// Live stream of session changes. `None` means the session ended.
pub type SessionEvents = broadcast::Receiver<Option<Session>>;

/// Errors reported by an identity provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityProviderError {
    /// The provider answered with an error.
    #[error("provider rejected the request with status {status} ({code})")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Provider error code, e.g. `invalid_credentials`.
        code: String,
    },

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The operation needs a session and there is none.
    #[error("no active session")]
    NoSession,

    /// The provider answered with something that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<IdentityProviderError> for AuthFailure {
    fn from(error: IdentityProviderError) -> Self {
        match error {
            IdentityProviderError::Rejected { status, code } => match code.as_str() {
                "invalid_credentials" | "invalid_grant" => Self::InvalidCredentials,
                "email_not_confirmed" => Self::EmailNotConfirmed,
                "user_already_exists" | "email_exists" => Self::AlreadyRegistered,
                "weak_password" => Self::WeakPassword,
                "over_request_rate_limit" | "over_email_send_rate_limit" => Self::RateLimited,
                _ if status == 429 => Self::RateLimited,
                _ => Self::Rejected { code },
            },
            IdentityProviderError::Network(message) => Self::Network(message),
            IdentityProviderError::NoSession => Self::NoSession,
            IdentityProviderError::InvalidResponse(_) => Self::Rejected {
                code: "invalid_response".to_string(),
            },
        }
    }
}

/// Account metadata attached at sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpMetadata {
    /// Display name stored on the new profile.
    pub display_name: String,
    /// Requested role.
    pub role: Role,
}

/// What the provider did after accepting a sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account must be confirmed (e-mail link) before a session is issued.
    PendingConfirmation,
    /// A session was issued immediately and will arrive as a session event.
    SignedIn,
}

/// Port for the external identity provider.
///
/// Successful sign-in, sign-out and token refreshes are reported through the
/// session event stream, never through return values.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticates with an e-mail address and password.
    ///
    /// # Errors
    /// Returns an error if the credentials are rejected or the provider is unreachable.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), IdentityProviderError>;

    /// Creates an account.
    ///
    /// # Errors
    /// Returns an error if the provider refuses the account.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, IdentityProviderError>;

    /// Ends the current session.
    ///
    /// The local session is dropped even when the provider cannot be reached.
    ///
    /// # Errors
    /// Returns an error if the provider could not be told about the sign-out.
    async fn sign_out(&self) -> Result<(), IdentityProviderError>;

    /// Opens a receiver for session changes emitted from now on.
    fn subscribe(&self) -> SessionEvents;

    /// Reads the current session, renewing it first if it is about to expire.
    async fn current_session(&self) -> Option<Session>;

    /// Sends a password-reset mail linking back to `redirect_to`.
    ///
    /// # Errors
    /// Returns an error if the provider refuses or cannot be reached.
    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityProviderError>;

    /// Sets a new password within the recovery session carried by `recovery`.
    ///
    /// # Errors
    /// Returns an error if the recovery session is invalid or the password is refused.
    async fn update_password(
        &self,
        recovery: &RecoveryLink,
        new_password: &str,
    ) -> Result<(), IdentityProviderError>;
}
