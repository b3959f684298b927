//! Leave-reference route parameters.
//!
//! The page lives at `/leave-reference/{referenceType}/{userId}[/{hostRequestId}]`.
//! The reference type segment is kept as the raw string: an unknown type is
//! not a routing error, it is an outcome the resolver reports.

use thiserror::Error;

use crate::ids::{HostRequestId, UserId};
use crate::reference::ReferenceType;

pub const LEAVE_REFERENCE_BASE_ROUTE: &str = "/leave-reference";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("path {0:?} is not under {LEAVE_REFERENCE_BASE_ROUTE}")]
    WrongPrefix(String),
    #[error("missing {0} segment")]
    MissingSegment(&'static str),
    #[error("user id {0:?} is not a number")]
    InvalidUserId(String),
    #[error("host request id {0:?} is not a number")]
    InvalidHostRequestId(String),
    #[error("unexpected trailing segment {0:?}")]
    TrailingSegment(String),
}

/// What the viewer asked to write, straight from the route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTypeRequest {
    pub reference_type: String,
    pub subject_user_id: UserId,
    pub host_request_id: Option<HostRequestId>,
}

impl ReferenceTypeRequest {
    #[must_use]
    pub fn new(
        reference_type: impl Into<String>,
        subject_user_id: UserId,
        host_request_id: Option<HostRequestId>,
    ) -> Self {
        Self {
            reference_type: reference_type.into(),
            subject_user_id,
            host_request_id,
        }
    }

    /// Parse a full page path. A single trailing slash is tolerated.
    pub fn parse_path(path: &str) -> Result<Self, RouteError> {
        let rest = path
            .strip_prefix(LEAVE_REFERENCE_BASE_ROUTE)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| RouteError::WrongPrefix(path.to_string()))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let mut segments = rest.split('/').skip(1);
        let reference_type = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(RouteError::MissingSegment("reference type"))?;
        let user_id = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(RouteError::MissingSegment("user id"))?;
        let host_request_id = segments.next();
        if let Some(extra) = segments.next() {
            return Err(RouteError::TrailingSegment(extra.to_string()));
        }

        Self::from_segments(reference_type, user_id, host_request_id)
    }

    /// Build from already-split route parameters.
    pub fn from_segments(
        reference_type: &str,
        user_id: &str,
        host_request_id: Option<&str>,
    ) -> Result<Self, RouteError> {
        let subject_user_id = user_id
            .parse::<u64>()
            .map(UserId::new)
            .map_err(|_| RouteError::InvalidUserId(user_id.to_string()))?;
        let host_request_id = host_request_id
            .map(|raw| {
                raw.parse::<u64>()
                    .map(HostRequestId::new)
                    .map_err(|_| RouteError::InvalidHostRequestId(raw.to_string()))
            })
            .transpose()?;

        Ok(Self::new(reference_type, subject_user_id, host_request_id))
    }

    /// The requested type, if it is one of the known identifiers.
    #[must_use]
    pub fn known_reference_type(&self) -> Option<ReferenceType> {
        ReferenceType::parse(&self.reference_type)
    }

    #[must_use]
    pub fn path(&self) -> String {
        let mut path = format!(
            "{LEAVE_REFERENCE_BASE_ROUTE}/{}/{}",
            self.reference_type, self.subject_user_id
        );
        if let Some(host_request_id) = self.host_request_id {
            path.push('/');
            path.push_str(&host_request_id.to_string());
        }
        path
    }
}

/// Canonical page path for a known reference type.
#[must_use]
pub fn leave_reference_path(
    reference_type: ReferenceType,
    user_id: UserId,
    host_request_id: Option<HostRequestId>,
) -> String {
    ReferenceTypeRequest::new(reference_type.as_str(), user_id, host_request_id).path()
}
