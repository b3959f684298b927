//! Page-level logic for the leave-reference flow.
//!
//! This crate sits between the pure decision logic in [`vouch_types`] and the
//! remote collaborators in [`vouch_providers`]:
//!
//! - [`QueryCache`] - process-wide keyed store with generation-checked writes
//! - [`LeaveReferencePage`] - opens a page, runs both fetches, exposes state
//! - [`render`] - maps page state to a [`PageView`] by exhaustive match

mod cache;
mod page;
mod view;

pub use cache::{CacheEntry, FetchTicket, QueryCache, Subscription};
pub use page::{LeaveReferencePage, PageCaches, PageSources};
pub use view::{
    Alert, INVALID_REFERENCE_TYPE, Indicator, PageState, PageView, REFERENCE_TYPE_NOT_AVAILABLE,
    USER_REFERENCES_UNAVAILABLE, render,
};
