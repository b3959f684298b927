//! Presentation gating for the leave-reference page.
//!
//! The page is rendered from a single [`EligibilityResult`] by exhaustive
//! match. Loading and error indicators only appear when the result is
//! `DataUnavailable`; the invalid-type alert never waits on the network.

use std::fmt;

use vouch_types::{
    AvailableReferences, EligibilityInput, EligibilityResult, FetchState, Grant, HostRequestId,
    NonEmptyStaticStr, NonEmptyString, ReferenceType, ReferenceTypeRequest, SubjectUser,
    UserOverview, resolve_eligibility,
};

pub const INVALID_REFERENCE_TYPE: NonEmptyStaticStr =
    NonEmptyStaticStr::new("This is not a valid reference type.");
pub const REFERENCE_TYPE_NOT_AVAILABLE: NonEmptyStaticStr =
    NonEmptyStaticStr::new("You can't write this kind of reference for this user.");
pub const USER_REFERENCES_UNAVAILABLE: NonEmptyStaticStr =
    NonEmptyStaticStr::new("This user's references couldn't be loaded.");

/// Data the page has fetched so far. Each source moves independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    pub user: FetchState<SubjectUser>,
    pub availability: FetchState<AvailableReferences>,
}

impl PageState {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.user.is_pending() && !self.availability.is_pending()
    }

    #[must_use]
    pub fn eligibility(&self, request: &ReferenceTypeRequest) -> EligibilityResult {
        resolve_eligibility(&EligibilityInput::from_fetch_states(
            &request.reference_type,
            &self.user,
            &self.availability,
            request.host_request_id,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    message: NonEmptyString,
}

impl Alert {
    #[must_use]
    pub fn error(message: impl Into<NonEmptyString>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

/// Status drawn above a blocked page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indicator {
    Error(Alert),
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView {
    /// Invalid type or not available: a single alert, nothing else.
    Alert(Alert),
    /// Data missing. Fetch errors come first, then a spinner if anything is
    /// still loading, then the fixed unavailable message.
    Blocked {
        indicators: Vec<Indicator>,
        alert: Alert,
    },
    /// The reference form, with a read-only overview of the subject.
    Form {
        overview: UserOverview,
        reference_type: ReferenceType,
        host_request_id: Option<HostRequestId>,
        grant: Grant,
    },
}

impl PageView {
    #[must_use]
    pub const fn is_form(&self) -> bool {
        matches!(self, PageView::Form { .. })
    }
}

fn indicators(state: &PageState) -> Vec<Indicator> {
    let mut indicators: Vec<Indicator> = [state.user.failure(), state.availability.failure()]
        .into_iter()
        .flatten()
        .map(|failure| Indicator::Error(Alert::error(failure.message().clone())))
        .collect();
    if state.user.is_pending() || state.availability.is_pending() {
        indicators.push(Indicator::Loading);
    }
    indicators
}

fn blocked(state: &PageState) -> PageView {
    PageView::Blocked {
        indicators: indicators(state),
        alert: Alert::error(USER_REFERENCES_UNAVAILABLE),
    }
}

#[must_use]
pub fn render(request: &ReferenceTypeRequest, state: &PageState) -> PageView {
    match state.eligibility(request) {
        EligibilityResult::InvalidType => PageView::Alert(Alert::error(INVALID_REFERENCE_TYPE)),
        EligibilityResult::NotAvailable => {
            PageView::Alert(Alert::error(REFERENCE_TYPE_NOT_AVAILABLE))
        }
        EligibilityResult::DataUnavailable => blocked(state),
        EligibilityResult::Eligible { grant } => {
            match (request.known_reference_type(), state.user.value()) {
                (Some(reference_type), Some(user)) => PageView::Form {
                    overview: user.overview(),
                    reference_type,
                    host_request_id: request.host_request_id,
                    grant,
                },
                // The resolver only reports Eligible for a known type with the user present.
                _ => blocked(state),
            }
        }
    }
}

impl fmt::Display for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageView::Alert(alert) => write!(f, "{alert}"),
            PageView::Blocked { indicators, alert } => {
                for indicator in indicators {
                    match indicator {
                        Indicator::Error(error) => writeln!(f, "{error}")?,
                        Indicator::Loading => writeln!(f, "loading...")?,
                    }
                }
                write!(f, "{alert}")
            }
            PageView::Form {
                overview,
                reference_type,
                host_request_id,
                grant: _,
            } => {
                write!(f, "Write a {reference_type} reference for {overview}")?;
                if let Some(id) = host_request_id {
                    write!(f, " (host request {id})")?;
                }
                Ok(())
            }
        }
    }
}
