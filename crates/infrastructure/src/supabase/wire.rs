//! Wire formats of the GoTrue and PostgREST APIs.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use amparo_application::ports::{IdentityProviderError, ProfileStoreError};
use amparo_domain::{Identity, IdentityId, Session};

/// Session payload returned by the token and sign-up endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: UserResponse,
}

/// User object embedded in token responses.
#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenResponse {
    /// Converts the payload into a domain session issued at `now`.
    pub fn into_session(self, now: DateTime<Utc>) -> Result<Session, IdentityProviderError> {
        let id: IdentityId = self
            .user
            .id
            .parse()
            .map_err(|_| IdentityProviderError::InvalidResponse("malformed user id".to_string()))?;
        let mut session = Session::issued(
            self.access_token,
            self.refresh_token,
            now,
            self.expires_in,
            Identity::new(id, self.user.email),
        )
        .map_err(|e| IdentityProviderError::InvalidResponse(e.to_string()))?;
        if let Some(token_type) = self.token_type {
            session.token_type = token_type;
        }
        if let Some(expires_at) = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        {
            session.expires_at = expires_at;
        }
        Ok(session)
    }
}

/// Body of `POST /auth/v1/token?grant_type=password`.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/v1/token?grant_type=refresh_token`.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

/// Body of `POST /auth/v1/signup`.
#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpData<'a>,
}

/// User metadata stored with a new account.
#[derive(Debug, Serialize)]
pub(crate) struct SignUpData<'a> {
    pub name: &'a str,
    pub role: &'a str,
}

/// Body of `POST /auth/v1/recover`.
#[derive(Debug, Serialize)]
pub(crate) struct RecoverRequest<'a> {
    pub email: &'a str,
}

/// Body of `PUT /auth/v1/user`.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordUpdate<'a> {
    pub password: &'a str,
}

/// Body of `POST /rest/v1/rpc/get_user_role`.
#[derive(Debug, Serialize)]
pub(crate) struct RoleLookup {
    pub user_id: IdentityId,
}

/// Error body of the auth API. Older servers use `error`/`error_description`,
/// newer ones `error_code`/`msg`.
#[derive(Debug, Default, Deserialize)]
struct GoTrueError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Turns a failed auth API response into a tagged provider error.
pub(crate) fn gotrue_rejection(status: u16, body: &str) -> IdentityProviderError {
    let error: GoTrueError = serde_json::from_str(body).unwrap_or_default();
    let message = error
        .msg
        .as_deref()
        .or(error.error_description.as_deref())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let code = if message.contains("email not confirmed") {
        "email_not_confirmed".to_string()
    } else if let Some(code) = error.error_code.or(error.error) {
        code
    } else {
        format!("http_{status}")
    };
    IdentityProviderError::Rejected { status, code }
}

/// Error body of the data API.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Turns a failed data API response into a store error.
pub(crate) fn postgrest_rejection(status: u16, body: &str) -> ProfileStoreError {
    if status == 401 {
        return ProfileStoreError::Unauthorized;
    }
    let error: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = match (error.code, error.message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (None, Some(message)) => message,
        (Some(code), None) => code,
        (None, None) => format!("HTTP {status}"),
    };
    ProfileStoreError::Rejected { status, message }
}
