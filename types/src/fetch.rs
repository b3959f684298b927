//! Explicit state of one asynchronous data source.
//!
//! A value is either still loading, failed, or present. There is no "falsy"
//! in-between: consumers match on the variant.

use crate::proofs::{NonEmptyStaticStr, NonEmptyString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchFailureKind {
    /// The remote resource does not exist.
    NotFound,
    /// Transport failure (connect, timeout, reset) after retries.
    Network,
    /// Non-success HTTP status other than not-found.
    Http,
    /// The response body could not be decoded.
    Decode,
}

impl FetchFailureKind {
    const fn fallback_message(self) -> NonEmptyStaticStr {
        match self {
            FetchFailureKind::NotFound => NonEmptyStaticStr::new("Not found."),
            FetchFailureKind::Network => NonEmptyStaticStr::new("Network error."),
            FetchFailureKind::Http => NonEmptyStaticStr::new("The server returned an error."),
            FetchFailureKind::Decode => {
                NonEmptyStaticStr::new("The server sent a response we couldn't read.")
            }
        }
    }
}

/// Why a fetch produced no value. Always carries displayable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    kind: FetchFailureKind,
    message: NonEmptyString,
}

impl FetchFailure {
    /// Blank messages are replaced with a generic one for `kind`.
    #[must_use]
    pub fn new(kind: FetchFailureKind, message: impl Into<String>) -> Self {
        let message = NonEmptyString::new(message)
            .unwrap_or_else(|_| NonEmptyString::from(kind.fallback_message()));
        Self { kind, message }
    }

    #[must_use]
    pub const fn kind(&self) -> FetchFailureKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &NonEmptyString {
        &self.message
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState<T> {
    #[default]
    Pending,
    Failed(FetchFailure),
    Succeeded(T),
}

impl<T> FetchState<T> {
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            FetchState::Succeeded(value) => Some(value),
            FetchState::Pending | FetchState::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchState::Failed(failure) => Some(failure),
            FetchState::Pending | FetchState::Succeeded(_) => None,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, FetchState::Pending)
    }

    #[must_use]
    pub fn from_result<E>(result: Result<T, E>) -> Self
    where
        E: Into<FetchFailure>,
    {
        match result {
            Ok(value) => FetchState::Succeeded(value),
            Err(e) => FetchState::Failed(e.into()),
        }
    }
}
