//! Tagged authentication failures.

use thiserror::Error;

/// Failure of an identity-provider operation, as seen by the application.
///
/// The `Display` form is meant for logs; [`AuthFailure::user_message`] is the
/// localized text shown next to a form. Neither carries raw provider payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// The address/secret pair was rejected.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The account exists but its address was never confirmed.
    #[error("email address not confirmed")]
    EmailNotConfirmed,

    /// Sign-up for an address that already has an account.
    #[error("account already registered")]
    AlreadyRegistered,

    /// The secret does not satisfy the provider's password policy.
    #[error("password rejected by provider policy")]
    WeakPassword,

    /// The provider is throttling requests.
    #[error("too many requests")]
    RateLimited,

    /// The provider could not be reached.
    #[error("network failure: {0}")]
    Network(String),

    /// The operation needs a session and there is none.
    #[error("no active session")]
    NoSession,

    /// A password recovery link was missing, malformed or expired.
    #[error("invalid recovery link")]
    InvalidRecoveryLink,

    /// Any other rejection, tagged with the provider's error code.
    #[error("identity provider rejected the request ({code})")]
    Rejected {
        /// Provider error code, or the HTTP status when none was given.
        code: String,
    },
}

impl AuthFailure {
    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited)
    }

    /// Localized message suitable for display near the originating form.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E-mail ou senha inválidos.",
            Self::EmailNotConfirmed => "Confirme seu e-mail antes de entrar.",
            Self::AlreadyRegistered => "Este e-mail já está cadastrado.",
            Self::WeakPassword => "A senha deve ter pelo menos 6 caracteres.",
            Self::RateLimited => "Muitas tentativas. Aguarde alguns instantes e tente novamente.",
            Self::Network(_) => {
                "Não foi possível conectar ao servidor. Verifique sua conexão e tente novamente."
            }
            Self::NoSession => "Sua sessão expirou. Faça login novamente.",
            Self::InvalidRecoveryLink => {
                "Este link de redefinição de senha não é válido ou expirou."
            }
            Self::Rejected { .. } => "Não foi possível concluir a operação. Tente novamente.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_failures() {
        assert!(AuthFailure::Network("connection reset".to_string()).is_retryable());
        assert!(AuthFailure::RateLimited.is_retryable());
        assert!(!AuthFailure::InvalidCredentials.is_retryable());
        assert!(!AuthFailure::EmailNotConfirmed.is_retryable());
    }

    #[test]
    fn test_user_message_hides_provider_details() {
        let failure = AuthFailure::Rejected {
            code: "unexpected_failure".to_string(),
        };
        assert!(!failure.user_message().contains("unexpected_failure"));

        let failure = AuthFailure::Network("dns error: api.internal".to_string());
        assert!(!failure.user_message().contains("api.internal"));
    }
}
