//! Remote data sources for the leave-reference page.
//!
//! # Architecture
//!
//! Two collaborator traits describe what the page needs from the platform API:
//!
//! - [`UserDirectory`] - look up the subject user as seen by the viewer
//! - [`ReferenceAvailabilitySource`] - which references the viewer may still write
//!
//! [`ApiClient`] implements both over HTTP + JSON:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `get_user` | `GET {base}/api/users/{id}` |
//! | `list_available_references` | `GET {base}/api/references/available/{id}` |
//!
//! Transport failures are retried per [`retry::RetryConfig`]. A 404 maps to
//! [`ProviderError::NotFound`]; any other non-2xx maps to [`ProviderError::Http`]
//! with a capped copy of the response body.

mod error;
pub mod retry;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

pub use error::ProviderError;
pub use vouch_types;

use vouch_types::{AvailableReferences, SubjectUser, UserId};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Look up users as seen by the current viewer.
pub trait UserDirectory: Send + Sync {
    fn get_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<SubjectUser, ProviderError>> + Send;
}

/// Which references the current viewer may write about a user.
pub trait ReferenceAvailabilitySource: Send + Sync {
    fn list_available_references(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<AvailableReferences, ProviderError>> + Send;
}

impl<T: UserDirectory> UserDirectory for Arc<T> {
    fn get_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<SubjectUser, ProviderError>> + Send {
        (**self).get_user(user_id)
    }
}

impl<T: ReferenceAvailabilitySource> ReferenceAvailabilitySource for Arc<T> {
    fn list_available_references(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<AvailableReferences, ProviderError>> + Send {
        (**self).list_available_references(user_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiConfigError {
    #[error("API base URL must use http or https, got {0:?}")]
    UnsupportedScheme(String),
    #[error("API base URL {0} cannot carry a path")]
    NotABase(Url),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Endpoint, credentials and transport tuning for [`ApiClient`].
///
/// ```rust
/// use std::time::Duration;
/// use vouch_providers::ApiConfig;
///
/// let config = ApiConfig::new("https://api.example.org".parse().unwrap())
///     .unwrap()
///     .with_session_token("secret")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url().as_str(), "https://api.example.org/");
/// ```
#[derive(Clone)]
pub struct ApiConfig {
    base_url: Url,
    session_token: Option<String>,
    timeout: Duration,
    retry: retry::RetryConfig,
}

// Manual Debug impl to keep the session token out of logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ApiConfig {
    pub fn new(base_url: Url) -> Result<Self, ApiConfigError> {
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiConfigError::UnsupportedScheme(
                base_url.scheme().to_string(),
            ));
        }
        if base_url.cannot_be_a_base() {
            return Err(ApiConfigError::NotABase(base_url));
        }

        Ok(Self {
            base_url,
            session_token: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: retry::RetryConfig::default(),
        })
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: retry::RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn retry(&self) -> &retry::RetryConfig {
        &self.retry
    }
}

/// HTTP client for the platform API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiConfigError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .redirect(reqwest::redirect::Policy::none())
            .https_only(config.base_url.scheme() == "https")
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.config.base_url.clone();
        // `ApiConfig::new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, url: &Url) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.config.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        resource: String,
    ) -> Result<T, ProviderError> {
        tracing::debug!(%url, %resource, "Fetching");

        let response =
            match retry::send_with_retry(|| self.request(&url), &self.config.retry).await {
                retry::RetryOutcome::Success(response) => response,
                retry::RetryOutcome::HttpError(response) => {
                    return Err(error_from_response(response, resource).await);
                }
                retry::RetryOutcome::Transport { attempts, source } => {
                    return Err(ProviderError::Network {
                        attempts,
                        message: source.to_string(),
                    });
                }
            };

        let body = response.bytes().await.map_err(|e| ProviderError::Network {
            attempts: 1,
            message: e.to_string(),
        })?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(%e, %resource, "Failed to decode response");
            ProviderError::Decode(e.to_string())
        })
    }
}

impl UserDirectory for ApiClient {
    async fn get_user(&self, user_id: UserId) -> Result<SubjectUser, ProviderError> {
        let id = user_id.to_string();
        let url = self.endpoint(&["api", "users", &id]);
        self.get_json(url, format!("user {user_id}")).await
    }
}

impl ReferenceAvailabilitySource for ApiClient {
    async fn list_available_references(
        &self,
        user_id: UserId,
    ) -> Result<AvailableReferences, ProviderError> {
        let id = user_id.to_string();
        let url = self.endpoint(&["api", "references", "available", &id]);
        self.get_json(url, format!("available references for user {user_id}"))
            .await
    }
}

async fn error_from_response(response: reqwest::Response, resource: String) -> ProviderError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return ProviderError::NotFound { resource };
    }
    let body = read_capped_error_body(response).await;
    tracing::warn!(%status, %resource, "API request failed");
    ProviderError::Http { status, body }
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
