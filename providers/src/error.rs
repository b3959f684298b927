use reqwest::StatusCode;
use thiserror::Error;
use vouch_types::{FetchFailure, FetchFailureKind};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("request failed after {attempts} attempt(s): {message}")]
    Network { attempts: u32, message: String },
    #[error("API error {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ProviderError {
    #[must_use]
    pub const fn failure_kind(&self) -> FetchFailureKind {
        match self {
            ProviderError::NotFound { .. } => FetchFailureKind::NotFound,
            ProviderError::Network { .. } => FetchFailureKind::Network,
            ProviderError::Http { .. } => FetchFailureKind::Http,
            ProviderError::Decode(_) => FetchFailureKind::Decode,
        }
    }
}

impl From<ProviderError> for FetchFailure {
    fn from(err: ProviderError) -> Self {
        FetchFailure::new(err.failure_kind(), err.to_string())
    }
}
