//! PostgREST profile store adapter.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use tracing::debug;

use amparo_application::ports::{ProfileStore, ProfileStoreError};
use amparo_domain::{IdentityId, ProfilePatch, ProfileRow, Role};

use super::backend::{AccessTokenSource, BackendClient};
use super::wire::{RoleLookup, postgrest_rejection};

const PROFILES_PATH: &str = "/rest/v1/profiles";
const ROLE_RPC_PATH: &str = "/rest/v1/rpc/get_user_role";

/// Profile store backed by the `profiles` table and the `get_user_role`
/// function of a PostgREST API.
///
/// Requests are authorized with the caller's access token so row-level
/// security applies. The role is read through the security-definer
/// function rather than the table.
pub struct PostgrestProfileStore {
    backend: BackendClient,
    tokens: Arc<dyn AccessTokenSource>,
}

impl PostgrestProfileStore {
    /// Creates a store that authorizes requests with tokens from `tokens`.
    #[must_use]
    pub fn new(backend: BackendClient, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self { backend, tokens }
    }

    async fn bearer(&self) -> Result<String, ProfileStoreError> {
        self.tokens
            .access_token()
            .await
            .ok_or(ProfileStoreError::Unauthorized)
    }

    fn profile_url(&self, id: IdentityId) -> url::Url {
        let filter = format!("eq.{id}");
        self.backend
            .endpoint(PROFILES_PATH, &[("id", filter.as_str()), ("select", "*")])
    }
}

fn network(error: reqwest::Error) -> ProfileStoreError {
    ProfileStoreError::Network(error.to_string())
}

fn invalid(error: impl std::fmt::Display) -> ProfileStoreError {
    ProfileStoreError::InvalidResponse(error.to_string())
}

async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProfileStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(postgrest_rejection(status.as_u16(), &body))
}

#[async_trait]
impl ProfileStore for PostgrestProfileStore {
    async fn read_role(&self, id: IdentityId) -> Result<Role, ProfileStoreError> {
        let token = self.bearer().await?;
        let response = self
            .backend
            .http()
            .post(self.backend.endpoint(ROLE_RPC_PATH, &[]))
            .bearer_auth(token)
            .json(&RoleLookup { user_id: id })
            .send()
            .await
            .map_err(network)?;
        let value: serde_json::Value = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(invalid)?;

        let role = value
            .as_str()
            .ok_or_else(|| invalid(format!("expected role string, got {value}")))?
            .parse::<Role>()
            .map_err(invalid)?;
        debug!(identity = %id, role = %role, "role read");
        Ok(role)
    }

    async fn read_profile(&self, id: IdentityId) -> Result<Option<ProfileRow>, ProfileStoreError> {
        let token = self.bearer().await?;
        let response = self
            .backend
            .http()
            .get(self.profile_url(id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network)?;
        let rows: Vec<ProfileRow> = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(invalid)?;
        Ok(rows.into_iter().next())
    }

    async fn update_profile(
        &self,
        id: IdentityId,
        patch: &ProfilePatch,
    ) -> Result<(), ProfileStoreError> {
        if patch.is_empty() {
            return Ok(());
        }
        let token = self.bearer().await?;
        let response = self
            .backend
            .http()
            .patch(self.profile_url(id))
            .bearer_auth(token)
            .header("Prefer", HeaderValue::from_static("return=minimal"))
            .json(patch)
            .send()
            .await
            .map_err(network)?;
        ensure_success(response).await?;
        debug!(identity = %id, "profile updated");
        Ok(())
    }
}
