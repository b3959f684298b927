//! Process-wide keyed query cache.
//!
//! One slot per key. Each slot records the generation of the last fetch or
//! invalidation that touched it, drawn from a cache-wide counter, and a
//! completed fetch is only stored if its ticket still carries that
//! generation. The most recently issued fetch wins, whatever order the
//! responses arrive in.
//!
//! Subscribers hold a [`Subscription`] (a `watch` receiver). Dropping it
//! unsubscribes; there is no callback that could outlive its view.
//!
//! # Eviction
//!
//! A slot is idle once nobody subscribes to it, its value is stale or older
//! than `stale_after`, and its last fetch either finished or started more
//! than `stale_after` ago. Idle slots are swept whenever a fetch begins, so
//! the map holds at most the keys touched within one `stale_after` window
//! plus those still subscribed. A result arriving for an evicted slot is
//! discarded.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
    pub generation: u64,
}

/// Permission to store the result of one fetch.
#[derive(Debug)]
#[must_use = "a fetch ticket must be completed for its result to be cached"]
pub struct FetchTicket<K> {
    key: K,
    generation: u64,
}

impl<K> FetchTicket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Live view of one cache key.
#[derive(Debug)]
pub struct Subscription<V> {
    rx: watch::Receiver<Option<CacheEntry<V>>>,
}

impl<V: Clone> Subscription<V> {
    /// The latest stored entry, if any.
    #[must_use]
    pub fn current(&self) -> Option<CacheEntry<V>> {
        self.rx.borrow().clone()
    }

    /// Wait for the next stored value. Returns `None` if the cache was dropped.
    pub async fn changed(&mut self) -> Option<CacheEntry<V>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

struct Slot<V> {
    generation: u64,
    stale: bool,
    /// Set by `begin_fetch`, cleared when that fetch is stored.
    fetch_started: Option<Instant>,
    entry: Option<CacheEntry<V>>,
    tx: watch::Sender<Option<CacheEntry<V>>>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            generation: 0,
            stale: false,
            fetch_started: None,
            entry: None,
            tx,
        }
    }

    fn is_idle(&self, stale_after: Duration) -> bool {
        if self.tx.receiver_count() > 0 {
            return false;
        }
        let expired = |at: Instant| at.elapsed() >= stale_after;
        let value_expired = match &self.entry {
            Some(entry) => self.stale || expired(entry.fetched_at),
            None => true,
        };
        value_expired && self.fetch_started.is_none_or(expired)
    }
}

struct Slots<K, V> {
    by_key: HashMap<K, Slot<V>>,
    /// Last generation handed out for any key.
    generation: u64,
}

impl<K, V> Slots<K, V> {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn sweep(&mut self, stale_after: Duration) -> usize {
        let before = self.by_key.len();
        self.by_key.retain(|_, slot| !slot.is_idle(stale_after));
        before - self.by_key.len()
    }
}

pub struct QueryCache<K, V> {
    slots: Mutex<Slots<K, V>>,
    stale_after: Duration,
}

impl<K, V> fmt::Debug for QueryCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("stale_after", &self.stale_after)
            .finish_non_exhaustive()
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    /// Entries older than `stale_after` are refetched by [`QueryCache::load`].
    /// `Duration::ZERO` disables reuse entirely.
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            slots: Mutex::new(Slots {
                by_key: HashMap::new(),
                generation: 0,
            }),
            stale_after,
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots<K, V>> {
        // Slot updates are single assignments; a panic elsewhere cannot leave one half-written.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.slots().by_key.get(key).and_then(|slot| slot.entry.clone())
    }

    /// A stored value that is neither invalidated nor older than `stale_after`.
    #[must_use]
    pub fn fresh(&self, key: &K) -> Option<V> {
        let slots = self.slots();
        let slot = slots.by_key.get(key)?;
        let entry = slot.entry.as_ref()?;
        (!slot.stale && entry.fetched_at.elapsed() < self.stale_after)
            .then(|| entry.value.clone())
    }

    /// Number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every idle slot now. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        self.slots().sweep(self.stale_after)
    }

    pub fn begin_fetch(&self, key: K) -> FetchTicket<K> {
        let mut slots = self.slots();
        let evicted = slots.sweep(self.stale_after);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle query cache slots");
        }
        let generation = slots.next_generation();
        let slot = slots.by_key.entry(key.clone()).or_insert_with(Slot::new);
        slot.generation = generation;
        slot.fetch_started = Some(Instant::now());
        FetchTicket { key, generation }
    }

    /// Store a fetched value. Returns `false` if a newer fetch or an
    /// invalidation happened after `ticket` was issued.
    pub fn complete(&self, ticket: FetchTicket<K>, value: V) -> bool {
        let mut slots = self.slots();
        let Some(slot) = slots.by_key.get_mut(&ticket.key) else {
            tracing::debug!(key = ?ticket.key, "Discarding fetch result for an evicted slot");
            return false;
        };
        if slot.generation != ticket.generation {
            tracing::debug!(
                key = ?ticket.key,
                ticket = ticket.generation,
                current = slot.generation,
                "Discarding superseded fetch result"
            );
            return false;
        }

        let entry = CacheEntry {
            value,
            fetched_at: Instant::now(),
            generation: ticket.generation,
        };
        slot.entry = Some(entry.clone());
        slot.stale = false;
        slot.fetch_started = None;
        slot.tx.send_replace(Some(entry));
        true
    }

    /// Mark `key` stale and supersede any fetch already in flight for it.
    pub fn invalidate(&self, key: &K) {
        let mut slots = self.slots();
        let generation = slots.next_generation();
        if let Some(slot) = slots.by_key.get_mut(key) {
            slot.stale = true;
            slot.generation = generation;
        }
    }

    pub fn subscribe(&self, key: K) -> Subscription<V> {
        let mut slots = self.slots();
        let slot = slots.by_key.entry(key).or_insert_with(Slot::new);
        Subscription {
            rx: slot.tx.subscribe(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.slots()
            .by_key
            .get(key)
            .map_or(0, |slot| slot.tx.receiver_count())
    }

    /// Return the fresh cached value for `key`, or run `fetch` and cache its
    /// result. Errors are returned to the caller and never cached.
    pub async fn load<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.fresh(&key) {
            tracing::debug!(key = ?key, "Query cache hit");
            return Ok(value);
        }

        let ticket = self.begin_fetch(key);
        let value = fetch().await?;
        self.complete(ticket, value.clone());
        Ok(value)
    }
}
