//! Reference eligibility resolver.
//!
//! Decides whether the viewer may write the requested reference about the
//! subject user, and if not, which outcome the page should show instead.
//!
//! Evaluation order is fixed and short-circuits:
//!
//! 1. Unknown reference type → [`EligibilityResult::InvalidType`]. Needs no network data.
//! 2. Subject user or availability missing → [`EligibilityResult::DataUnavailable`].
//! 3. Friend grant OR host-request grant → [`EligibilityResult::Eligible`],
//!    otherwise [`EligibilityResult::NotAvailable`].
//!
//! The function is pure: no interior state, no IO, same input same output.

use crate::fetch::FetchState;
use crate::ids::HostRequestId;
use crate::reference::{AvailableReferences, ReferenceType, SubjectUser};

/// Which grant made the viewer eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grant {
    Friend,
    HostRequest,
    Both,
}

impl Grant {
    /// `None` when neither grant holds.
    #[must_use]
    pub const fn from_flags(friend: bool, host_request: bool) -> Option<Self> {
        match (friend, host_request) {
            (true, true) => Some(Grant::Both),
            (true, false) => Some(Grant::Friend),
            (false, true) => Some(Grant::HostRequest),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EligibilityResult {
    Eligible { grant: Grant },
    InvalidType,
    NotAvailable,
    DataUnavailable,
}

impl EligibilityResult {
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        matches!(self, EligibilityResult::Eligible { .. })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EligibilityResult::Eligible { .. } => "ELIGIBLE",
            EligibilityResult::InvalidType => "INVALID_TYPE",
            EligibilityResult::NotAvailable => "NOT_AVAILABLE",
            EligibilityResult::DataUnavailable => "DATA_UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for EligibilityResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the resolver looks at. Absent data means pending or failed.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityInput<'a> {
    pub reference_type: &'a str,
    pub subject_user: Option<&'a SubjectUser>,
    pub available_references: Option<&'a AvailableReferences>,
    pub host_request_id: Option<HostRequestId>,
}

impl<'a> EligibilityInput<'a> {
    /// Pending and failed fetches both fold into "absent".
    #[must_use]
    pub fn from_fetch_states(
        reference_type: &'a str,
        subject_user: &'a FetchState<SubjectUser>,
        available_references: &'a FetchState<AvailableReferences>,
        host_request_id: Option<HostRequestId>,
    ) -> Self {
        Self {
            reference_type,
            subject_user: subject_user.value(),
            available_references: available_references.value(),
            host_request_id,
        }
    }
}

#[must_use]
pub fn friend_grant(
    reference_type: ReferenceType,
    subject_user: &SubjectUser,
    available: &AvailableReferences,
) -> bool {
    reference_type.is_friend()
        && available.can_write_friend_reference
        && subject_user.friends.is_friends()
}

#[must_use]
pub fn host_request_grant(
    host_request_id: Option<HostRequestId>,
    available: &AvailableReferences,
) -> bool {
    host_request_id.is_some_and(|id| available.find_host_request(id).is_some())
}

#[must_use]
pub fn resolve_eligibility(input: &EligibilityInput<'_>) -> EligibilityResult {
    let Some(reference_type) = ReferenceType::parse(input.reference_type) else {
        return EligibilityResult::InvalidType;
    };

    let (Some(subject_user), Some(available)) = (input.subject_user, input.available_references)
    else {
        return EligibilityResult::DataUnavailable;
    };

    let friend = friend_grant(reference_type, subject_user, available);
    let host_request = host_request_grant(input.host_request_id, available);

    match Grant::from_flags(friend, host_request) {
        Some(grant) => EligibilityResult::Eligible { grant },
        None => EligibilityResult::NotAvailable,
    }
}
