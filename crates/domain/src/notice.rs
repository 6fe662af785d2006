//! User-visible transient notices.
//!
//! Texts are written in Brazilian Portuguese, the product's locale. A notice
//! never carries identifiers, tokens or raw provider payloads.

use serde::{Deserialize, Serialize};

use crate::auth::AuthFailure;

/// Visual category of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// An operation completed.
    Success,
    /// Neutral information.
    Info,
    /// An operation failed.
    Error,
    /// A role guard refused navigation.
    AccessDenied,
}

/// A short message shown to the user (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Category.
    pub kind: NoticeKind,
    /// Headline.
    pub title: String,
    /// Optional detail line.
    pub description: Option<String>,
}

impl Notice {
    /// Creates a notice.
    #[must_use]
    pub fn new(kind: NoticeKind, title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description,
        }
    }

    /// Emitted by a role guard when the current role is not allowed.
    #[must_use]
    pub fn access_denied() -> Self {
        Self::new(
            NoticeKind::AccessDenied,
            "Acesso negado",
            Some("Você não tem permissão para acessar esta página.".to_string()),
        )
    }

    /// Emitted after a profile update was persisted.
    #[must_use]
    pub fn profile_updated() -> Self {
        Self::new(
            NoticeKind::Success,
            "Perfil atualizado",
            Some("Suas informações foram salvas com sucesso.".to_string()),
        )
    }

    /// Emitted after a profile update failed and was rolled back.
    #[must_use]
    pub fn profile_update_failed() -> Self {
        Self::new(
            NoticeKind::Error,
            "Erro ao atualizar perfil",
            Some("Não foi possível salvar as alterações. Tente novamente.".to_string()),
        )
    }

    /// Emitted after the provider accepted a sign-in.
    #[must_use]
    pub fn signed_in() -> Self {
        Self::new(
            NoticeKind::Success,
            "Login realizado com sucesso",
            Some("Bem-vindo de volta!".to_string()),
        )
    }

    /// Emitted after an account was created and awaits confirmation.
    #[must_use]
    pub fn signed_up() -> Self {
        Self::new(
            NoticeKind::Success,
            "Conta criada com sucesso",
            Some("Verifique seu email para confirmar o cadastro.".to_string()),
        )
    }

    /// Emitted after the user signed out.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::new(
            NoticeKind::Info,
            "Logout realizado",
            Some("Você foi desconectado com sucesso.".to_string()),
        )
    }

    /// Emitted after a reset mail was requested.
    #[must_use]
    pub fn password_reset_sent() -> Self {
        Self::new(
            NoticeKind::Success,
            "E-mail enviado",
            Some("Verifique sua caixa de entrada para redefinir sua senha.".to_string()),
        )
    }

    /// Emitted after the password was changed through a recovery link.
    #[must_use]
    pub fn password_updated() -> Self {
        Self::new(
            NoticeKind::Success,
            "Senha alterada com sucesso",
            Some("Sua senha foi redefinida. Você agora pode fazer login.".to_string()),
        )
    }

    /// Emitted when a reset link lacks the recovery marker or has expired.
    #[must_use]
    pub fn invalid_recovery_link() -> Self {
        Self::new(
            NoticeKind::Error,
            "Link inválido",
            Some(AuthFailure::InvalidRecoveryLink.user_message().to_string()),
        )
    }

    /// Error notice for a failed identity operation, using its localized message.
    #[must_use]
    pub fn from_failure(failure: &AuthFailure) -> Self {
        Self::new(
            NoticeKind::Error,
            "Erro",
            Some(failure.user_message().to_string()),
        )
    }
}
