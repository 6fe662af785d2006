//! Shared HTTP client for the backend APIs.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::config::BackendConfig;

/// Errors raised while building the backend client.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The anon key cannot be sent as a header value.
    #[error("invalid anon key: {0}")]
    InvalidKey(String),

    /// The URL cannot serve as a base for API paths.
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Supplies the bearer token used to authorize data requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Current access token, if anyone is signed in.
    async fn access_token(&self) -> Option<String>;
}

/// HTTP client bound to one backend project.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"***")
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Creates a client for the configured project.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be a base, the key is not a valid
    /// header value, or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        if config.url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.anon_key)
                .map_err(|e| BackendError::InvalidKey(e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Underlying HTTP client, with the `apikey` header preset.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Project base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Anon key; also used as the bearer token for anonymous requests.
    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Builds `{base}{path}` with the given query pairs.
    #[must_use]
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}{path}", url.path().trim_end_matches('/'));
        url.set_path(&joined);
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }
}
