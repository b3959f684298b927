//! Core domain types for Vouch.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application, including the
//! [`resolve_eligibility`] decision function that gates the leave-reference page.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod eligibility;
mod fetch;
mod ids;
mod proofs;
mod reference;
mod route;

pub use eligibility::{
    EligibilityInput, EligibilityResult, Grant, friend_grant, host_request_grant,
    resolve_eligibility,
};
pub use fetch::{FetchFailure, FetchFailureKind, FetchState};
pub use ids::{HostRequestId, UserId};
pub use proofs::{EmptyStringError, NonEmptyStaticStr, NonEmptyString};
pub use reference::{
    AvailableReferences, AvailableWriteReference, FriendshipStatus, ReferenceType, SubjectUser,
    UserOverview,
};
pub use route::{LEAVE_REFERENCE_BASE_ROUTE, ReferenceTypeRequest, RouteError, leave_reference_path};
