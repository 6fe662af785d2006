//! GoTrue identity provider adapter.
//!
//! Holds the current session in memory, broadcasts every change, and renews
//! the session when it is about to expire. Persisting the session across
//! restarts is left to the embedding application, which can hand a stored
//! session back through [`GoTrueIdentityProvider::restore_session`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};
use url::Url;

use amparo_application::ports::{
    Clock, IdentityProvider, IdentityProviderError, SessionEvents, SignUpMetadata, SignUpOutcome,
};
use amparo_domain::{RecoveryLink, Session};

use super::backend::{AccessTokenSource, BackendClient};
use super::wire::{
    PasswordGrant, PasswordUpdate, RecoverRequest, RefreshGrant, SignUpData, SignUpRequest,
    TokenResponse, gotrue_rejection,
};

/// Broadcast channel capacity for session change events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Sessions expiring within this margin are renewed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Identity provider backed by the GoTrue auth API.
pub struct GoTrueIdentityProvider {
    backend: BackendClient,
    clock: Arc<dyn Clock>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<Option<Session>>,
    refresh_lock: Mutex<()>,
}

impl GoTrueIdentityProvider {
    /// Creates a provider with no session.
    #[must_use]
    pub fn new(backend: BackendClient, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            clock,
            session: RwLock::new(None),
            events,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Reinstates a previously persisted session.
    ///
    /// An expired session is renewed first; if that fails it is discarded.
    ///
    /// # Errors
    /// Returns the renewal error when an expired session cannot be renewed.
    pub async fn restore_session(&self, session: Session) -> Result<(), IdentityProviderError> {
        if session.is_expired(self.clock.now()) {
            debug!(identity = %session.identity_id(), "restored session expired, renewing");
            self.refresh_with(&session.refresh_token).await?;
        } else {
            debug!(identity = %session.identity_id(), "session restored");
            self.store_session(session).await;
        }
        Ok(())
    }

    /// Renews the current session with its refresh token.
    ///
    /// # Errors
    /// Returns `IdentityProviderError::NoSession` if there is nothing to
    /// renew, or the provider's rejection. A rejected refresh token ends
    /// the session.
    pub async fn refresh_session(&self) -> Result<Session, IdentityProviderError> {
        let _serialized = self.refresh_lock.lock().await;
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(IdentityProviderError::NoSession)?;
        self.refresh_with(&refresh_token).await
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<Session, IdentityProviderError> {
        let url = self
            .backend
            .endpoint("/auth/v1/token", &[("grant_type", "refresh_token")]);
        match self
            .post_for_session(url, &RefreshGrant { refresh_token })
            .await
        {
            Ok(session) => {
                debug!(identity = %session.identity_id(), "session renewed");
                self.store_session(session.clone()).await;
                Ok(session)
            }
            Err(e) => {
                if matches!(e, IdentityProviderError::Rejected { .. }) {
                    warn!(error = %e, "refresh token rejected, ending session");
                    self.clear_session().await;
                }
                Err(e)
            }
        }
    }

    async fn post_for_session<B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<Session, IdentityProviderError> {
        let response = self
            .backend
            .http()
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(network)?;
        let response = ensure_success(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityProviderError::InvalidResponse(e.to_string()))?;
        token.into_session(self.clock.now())
    }

    async fn store_session(&self, session: Session) {
        *self.session.write().await = Some(session.clone());
        let _ = self.events.send(Some(session));
    }

    async fn clear_session(&self) {
        *self.session.write().await = None;
        let _ = self.events.send(None);
    }
}

fn network(error: reqwest::Error) -> IdentityProviderError {
    IdentityProviderError::Network(error.to_string())
}

async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, IdentityProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(gotrue_rejection(status.as_u16(), &body))
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), IdentityProviderError> {
        let url = self
            .backend
            .endpoint("/auth/v1/token", &[("grant_type", "password")]);
        let session = self
            .post_for_session(url, &PasswordGrant { email, password })
            .await?;
        info!(identity = %session.identity_id(), "signed in");
        self.store_session(session).await;
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, IdentityProviderError> {
        let body = SignUpRequest {
            email,
            password,
            data: SignUpData {
                name: &metadata.display_name,
                role: metadata.role.as_str(),
            },
        };
        let response = self
            .backend
            .http()
            .post(self.backend.endpoint("/auth/v1/signup", &[]))
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        let response = ensure_success(response).await?;
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IdentityProviderError::InvalidResponse(e.to_string()))?;

        if payload.get("access_token").is_none() {
            return Ok(SignUpOutcome::PendingConfirmation);
        }
        let token: TokenResponse = serde_json::from_value(payload)
            .map_err(|e| IdentityProviderError::InvalidResponse(e.to_string()))?;
        let session = token.into_session(self.clock.now())?;
        self.store_session(session).await;
        Ok(SignUpOutcome::SignedIn)
    }

    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        let access_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());
        let Some(access_token) = access_token else {
            self.clear_session().await;
            return Ok(());
        };

        let result = self
            .backend
            .http()
            .post(self.backend.endpoint("/auth/v1/logout", &[]))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(network);
        self.clear_session().await;

        match result {
            Ok(response) => match response.status().as_u16() {
                // The token was already invalid server-side.
                401 | 403 | 404 => Ok(()),
                _ => ensure_success(response).await.map(|_| ()),
            },
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> SessionEvents {
        self.events.subscribe()
    }

    async fn current_session(&self) -> Option<Session> {
        let session = self.session.read().await.clone()?;
        let now = self.clock.now();
        if !session.expires_within(now, Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Some(session);
        }

        let _serialized = self.refresh_lock.lock().await;
        // Another caller may have renewed it while we waited.
        let session = self.session.read().await.clone()?;
        if !session.expires_within(now, Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Some(session);
        }
        match self.refresh_with(&session.refresh_token).await {
            Ok(renewed) => Some(renewed),
            Err(e) => {
                warn!(error = %e, "failed to renew expiring session");
                let current = self.session.read().await.clone()?;
                (!current.is_expired(now)).then_some(current)
            }
        }
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityProviderError> {
        let url = self
            .backend
            .endpoint("/auth/v1/recover", &[("redirect_to", redirect_to)]);
        let response = self
            .backend
            .http()
            .post(url)
            .json(&RecoverRequest { email })
            .send()
            .await
            .map_err(network)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn update_password(
        &self,
        recovery: &RecoveryLink,
        new_password: &str,
    ) -> Result<(), IdentityProviderError> {
        let response = self
            .backend
            .http()
            .put(self.backend.endpoint("/auth/v1/user", &[]))
            .bearer_auth(recovery.access_token())
            .json(&PasswordUpdate {
                password: new_password,
            })
            .send()
            .await
            .map_err(network)?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AccessTokenSource for GoTrueIdentityProvider {
    async fn access_token(&self) -> Option<String> {
        self.current_session().await.map(|s| s.access_token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BackendConfig;
    use amparo_domain::{Identity, IdentityId, Role};

    const USER_ID: &str = "6f1c2a9e-3b4d-4c5e-8f70-112233445566";

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn provider(server: &MockServer, now: DateTime<Utc>) -> GoTrueIdentityProvider {
        let backend = BackendClient::new(&BackendConfig {
            url: Url::parse(&server.uri()).unwrap(),
            anon_key: "anon-key".to_string(),
            request_timeout_secs: 5,
        })
        .unwrap();
        GoTrueIdentityProvider::new(backend, Arc::new(FixedClock(now)))
    }

    fn token_body(access: &str, refresh: &str) -> serde_json::Value {
        json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": refresh,
            "user": {"id": USER_ID, "email": "ana@example.org"}
        })
    }

    fn stored_session(now: DateTime<Utc>, expires_in: i64) -> Session {
        Session::issued(
            "old-access",
            "old-refresh",
            now,
            expires_in,
            Identity::new(USER_ID.parse::<IdentityId>().unwrap(), None),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_stores_and_broadcasts_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({"email": "ana@example.org", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a1", "r1")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, Utc::now());
        let mut events = provider.subscribe();
        provider
            .sign_in_with_password("ana@example.org", "secret1")
            .await
            .unwrap();

        let event = events.recv().await.unwrap().unwrap();
        assert_eq!(event.access_token, "a1");
        assert_eq!(event.identity_id().to_string(), USER_ID);
        assert_eq!(provider.current_session().await.unwrap().access_token, "a1");
    }

    #[tokio::test]
    async fn test_sign_in_rejection_is_tagged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 400,
                "error_code": "invalid_credentials",
                "msg": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server, Utc::now());
        let result = provider.sign_in_with_password("ana@example.org", "x").await;

        assert_eq!(
            result,
            Err(IdentityProviderError::Rejected {
                status: 400,
                code: "invalid_credentials".to_string()
            })
        );
        assert!(provider.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_json(json!({
                "email": "novo@example.org",
                "password": "secret1",
                "data": {"name": "Novo", "role": "police"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": USER_ID,
                "email": "novo@example.org",
                "confirmation_sent_at": "2024-03-01T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server, Utc::now());
        let metadata = SignUpMetadata {
            display_name: "Novo".to_string(),
            role: Role::Police,
        };
        let outcome = provider
            .sign_up("novo@example.org", "secret1", &metadata)
            .await
            .unwrap();

        assert_eq!(outcome, SignUpOutcome::PendingConfirmation);
        assert!(provider.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_when_server_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer old-access"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let now = Utc::now();
        let provider = provider(&server, now);
        provider.restore_session(stored_session(now, 3600)).await.unwrap();
        let mut events = provider.subscribe();

        let result = provider.sign_out().await;

        assert!(result.is_err());
        assert_eq!(events.recv().await.unwrap(), None);
        assert!(provider.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_expiring_session_is_renewed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({"refresh_token": "old-refresh"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", "r2")))
            .expect(1)
            .mount(&server)
            .await;

        let now = Utc::now();
        let provider = provider(&server, now);
        provider.restore_session(stored_session(now, 30)).await.unwrap();

        let session = provider.current_session().await.unwrap();
        assert_eq!(session.access_token, "a2");
        assert_eq!(provider.access_token().await.as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_ends_expired_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_code": "refresh_token_not_found"
            })))
            .mount(&server)
            .await;

        let now = Utc::now();
        let provider = provider(&server, now);
        let result = provider
            .restore_session(stored_session(now - Duration::hours(2), 3600))
            .await;

        assert!(result.is_err());
        assert!(provider.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_password_reset_and_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/recover"))
            .and(query_param("redirect_to", "https://amparo.example.org/reset-password"))
            .and(body_json(json!({"email": "ana@example.org"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer recovery-token"))
            .and(body_json(json!({"password": "novasenha"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": USER_ID})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, Utc::now());
        provider
            .request_password_reset("ana@example.org", "https://amparo.example.org/reset-password")
            .await
            .unwrap();
        let link = RecoveryLink::from_fragment("#access_token=recovery-token&type=recovery").unwrap();
        provider.update_password(&link, "novasenha").await.unwrap();
    }
}
