//! Leave-reference page view-model.
//!
//! Opening a page starts two independent fetches (subject user and
//! available references) on the tokio runtime. Each one publishes into the
//! page's `watch` channel when it finishes, in whatever order that happens.
//!
//! Fetch tasks only hold a [`Weak`] handle to the page. Dropping the page
//! aborts them, and a result that still arrives afterwards finds nothing to
//! upgrade and is discarded. Each round of fetches is tagged with an epoch so
//! that results from before a [`LeaveReferencePage::refetch`] are discarded too.
//!
//! Each round also subscribes to both cache keys. When any other page stores
//! a newer value for the same user, the open page picks it up. The
//! subscriptions live in the round's tasks and are released with them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use vouch_providers::{ReferenceAvailabilitySource, UserDirectory};
use vouch_types::{
    AvailableReferences, EligibilityResult, FetchFailure, FetchState, ReferenceTypeRequest,
    SubjectUser, UserId,
};

use crate::cache::{QueryCache, Subscription};
use crate::view::{PageState, PageView, render};

/// Caches shared by every page in the process.
#[derive(Debug, Clone)]
pub struct PageCaches {
    pub users: Arc<QueryCache<UserId, SubjectUser>>,
    pub availability: Arc<QueryCache<UserId, AvailableReferences>>,
}

impl PageCaches {
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            users: Arc::new(QueryCache::new(stale_after)),
            availability: Arc::new(QueryCache::new(stale_after)),
        }
    }
}

/// Where the page gets its data from.
#[derive(Debug)]
pub struct PageSources<U, A> {
    pub users: Arc<U>,
    pub availability: Arc<A>,
}

impl<U, A> Clone for PageSources<U, A> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            availability: Arc::clone(&self.availability),
        }
    }
}

struct Shared {
    state: watch::Sender<PageState>,
    epoch: AtomicU64,
}

/// Apply `update` to the page state unless the page is closed or `epoch` is
/// no longer current. Returns whether the state changed.
fn publish<F>(shared: &Weak<Shared>, epoch: u64, source: &'static str, update: F) -> bool
where
    F: FnOnce(&mut PageState) -> bool,
{
    let Some(shared) = shared.upgrade() else {
        tracing::debug!(source, "Page closed; discarding late fetch result");
        return false;
    };
    let mut superseded = false;
    let modified = shared.state.send_if_modified(|state| {
        if shared.epoch.load(Ordering::SeqCst) != epoch {
            superseded = true;
            return false;
        }
        update(state)
    });
    if superseded {
        tracing::debug!(source, epoch, "Discarding fetch result from a superseded round");
    }
    modified
}

/// Forward values any page stores under this key into the page state.
async fn follow_cache<V>(
    mut subscription: Subscription<V>,
    shared: Weak<Shared>,
    epoch: u64,
    source: &'static str,
    apply: fn(&mut PageState, V) -> bool,
) where
    V: Clone,
{
    while let Some(entry) = subscription.changed().await {
        if publish(&shared, epoch, source, |state| apply(state, entry.value)) {
            tracing::debug!(source, epoch, "Page refreshed from query cache");
        }
    }
}

fn refresh_user(state: &mut PageState, user: SubjectUser) -> bool {
    if state.user.value() == Some(&user) {
        return false;
    }
    state.user = FetchState::Succeeded(user);
    true
}

fn refresh_availability(state: &mut PageState, available: AvailableReferences) -> bool {
    if state.availability.value() == Some(&available) {
        return false;
    }
    state.availability = FetchState::Succeeded(available);
    true
}

pub struct LeaveReferencePage<U, A> {
    request: ReferenceTypeRequest,
    sources: PageSources<U, A>,
    caches: PageCaches,
    shared: Arc<Shared>,
    rx: watch::Receiver<PageState>,
    tasks: Vec<JoinHandle<()>>,
}

impl<U, A> LeaveReferencePage<U, A>
where
    U: UserDirectory + 'static,
    A: ReferenceAvailabilitySource + 'static,
{
    /// Open the page and start fetching. Must be called inside a tokio runtime.
    #[must_use]
    pub fn open(
        request: ReferenceTypeRequest,
        sources: PageSources<U, A>,
        caches: PageCaches,
    ) -> Self {
        let (tx, rx) = watch::channel(PageState::default());
        let mut page = Self {
            request,
            sources,
            caches,
            shared: Arc::new(Shared {
                state: tx,
                epoch: AtomicU64::new(0),
            }),
            rx,
            tasks: Vec::with_capacity(4),
        };
        page.start_fetches();
        // The reset inside `start_fetches` is not a change worth reporting on open.
        page.rx.borrow_and_update();
        page
    }

    fn start_fetches(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.send_replace(PageState::default());

        let user_id = self.request.subject_user_id;
        tracing::debug!(%user_id, epoch, path = %self.request.path(), "Starting page fetches");

        // Subscribe before loading so every value stored from here on is seen.
        let user_updates = self.caches.users.subscribe(user_id);
        let availability_updates = self.caches.availability.subscribe(user_id);

        let users = Arc::clone(&self.sources.users);
        let cache = Arc::clone(&self.caches.users);
        let shared = Arc::downgrade(&self.shared);
        self.tasks.push(tokio::spawn(async move {
            let result = cache.load(user_id, || users.get_user(user_id)).await;
            publish(&shared, epoch, "user", |state| {
                // A value another page stored this round outranks our failure.
                if result.is_err() && state.user.value().is_some() {
                    return false;
                }
                state.user = FetchState::from_result(result.map_err(FetchFailure::from));
                true
            });
        }));

        let availability = Arc::clone(&self.sources.availability);
        let cache = Arc::clone(&self.caches.availability);
        let shared = Arc::downgrade(&self.shared);
        self.tasks.push(tokio::spawn(async move {
            let result = cache
                .load(user_id, || availability.list_available_references(user_id))
                .await;
            publish(&shared, epoch, "availability", |state| {
                if result.is_err() && state.availability.value().is_some() {
                    return false;
                }
                state.availability = FetchState::from_result(result.map_err(FetchFailure::from));
                true
            });
        }));

        self.tasks.push(tokio::spawn(follow_cache(
            user_updates,
            Arc::downgrade(&self.shared),
            epoch,
            "user",
            refresh_user,
        )));
        self.tasks.push(tokio::spawn(follow_cache(
            availability_updates,
            Arc::downgrade(&self.shared),
            epoch,
            "availability",
            refresh_availability,
        )));
    }

    /// Invalidate both cache entries and fetch again from scratch.
    pub fn refetch(&mut self) {
        let user_id = self.request.subject_user_id;
        self.caches.users.invalidate(&user_id);
        self.caches.availability.invalidate(&user_id);
        self.start_fetches();
    }
}

impl<U, A> LeaveReferencePage<U, A> {
    #[must_use]
    pub fn request(&self) -> &ReferenceTypeRequest {
        &self.request
    }

    #[must_use]
    pub fn state(&self) -> PageState {
        self.rx.borrow().clone()
    }

    /// Recomputed from the current state on every call.
    #[must_use]
    pub fn eligibility(&self) -> EligibilityResult {
        self.rx.borrow().eligibility(&self.request)
    }

    #[must_use]
    pub fn view(&self) -> PageView {
        render(&self.request, &self.rx.borrow())
    }

    /// A receiver for a presentation layer that re-renders on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PageState> {
        self.rx.clone()
    }

    /// Wait until the state changes from what was last observed here.
    pub async fn changed(&mut self) -> PageState {
        // The sender lives in `self.shared`, so the channel cannot close while we wait.
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    /// Wait until neither fetch is pending.
    pub async fn settled(&mut self) -> PageState {
        let settled = self
            .rx
            .wait_for(PageState::is_settled)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.rx.borrow().clone())
    }
}

impl<U, A> Drop for LeaveReferencePage<U, A> {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
