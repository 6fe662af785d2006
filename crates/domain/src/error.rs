//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A role string is not one of the known roles.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A profile row from the data store has an unexpected shape.
    #[error("malformed profile: {0}")]
    MalformedProfile(String),

    /// A password recovery link is missing its recovery marker or token.
    #[error("invalid recovery link: {0}")]
    InvalidRecoveryLink(String),

    /// A validity window that cannot be represented.
    #[error("invalid session lifetime: {0} seconds")]
    InvalidLifetime(i64),

    /// A synchronizer state snapshot violates one of its invariants.
    #[error("inconsistent state: {0}")]
    InconsistentState(&'static str),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
