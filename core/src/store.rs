//! Key-addressed cache of server state.
//!
//! # Overview
//! Each resource key owns a `CacheEntry` moving through
//! `Idle -> Loading -> (Success | Error)`, and back to `Loading` on
//! invalidation or refetch. Previously fetched data stays visible while a
//! refetch runs, so views can show stale rows with a loading indicator.
//!
//! # Design
//! - At most one fetch per key is in flight. `ensure` and `refetch` while one
//!   is running are no-ops.
//! - Every fetch is tagged with the key's generation when it starts.
//!   `invalidate` bumps the generation; a response whose tag no longer
//!   matches is dropped and replaced by exactly one follow-up fetch, no
//!   matter how many invalidations landed in between.
//! - Fetches run as spawned tokio tasks. The map sits behind a mutex that is
//!   never held across an await or while listeners run.
//! - A fetch that cannot start (no runtime) or that panics still completes,
//!   as an `Error` transition, so the key never stays stuck in `Loading`.
//! - Listeners are an explicit registry per key. `watch` adapts one onto a
//!   `tokio::sync::watch` channel holding only the latest entry.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::error::{ApiError, ApiResult};

/// Error recorded when a fetch is requested outside a tokio runtime.
pub const NO_RUNTIME_MESSAGE: &str = "no async runtime available to run the fetch";
/// Error recorded when a fetch future panics.
pub const FETCH_PANICKED_MESSAGE: &str = "fetch task panicked";

/// Produces one fetch of a key's data each time it is called.
pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync>;

type Listener<T> = Arc<dyn Fn(&CacheEntry<T>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one key's cached state.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// Last successfully fetched payload, kept through later loads and errors.
    pub data: Option<T>,
    pub status: FetchStatus,
    /// Message of the most recent failed fetch, cleared on success.
    pub error: Option<String>,
    pub generation: u64,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            status: FetchStatus::Idle,
            error: None,
            generation: 0,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    /// Loading while still holding data from an earlier fetch.
    pub fn is_stale(&self) -> bool {
        self.is_loading() && self.data.is_some()
    }
}

struct Slot<T> {
    entry: CacheEntry<T>,
    fetcher: Option<Fetcher<T>>,
    /// Sequence number of the fetch currently running for this key.
    flight: Option<u64>,
    listeners: Vec<(u64, Listener<T>)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            entry: CacheEntry::default(),
            fetcher: None,
            flight: None,
            listeners: Vec::new(),
        }
    }
}

struct Inner<T> {
    slots: HashMap<String, Slot<T>>,
    next_seq: u64,
}

/// A fetch decided under the lock, started after releasing it.
struct Launch<T> {
    key: String,
    fetcher: Fetcher<T>,
    flight: u64,
    generation: u64,
}

/// Work to carry out once the lock is released.
struct Effects<T> {
    notify: Vec<(Vec<Listener<T>>, CacheEntry<T>)>,
    launch: Option<Launch<T>>,
}

impl<T> Default for Effects<T> {
    fn default() -> Self {
        Self {
            notify: Vec::new(),
            launch: None,
        }
    }
}

impl<T: Clone> Slot<T> {
    fn snapshot(&self) -> (Vec<Listener<T>>, CacheEntry<T>) {
        let listeners = self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
        (listeners, self.entry.clone())
    }

    /// Move to `Loading` and hand back the fetch to start. Without a recorded
    /// fetcher there is nothing to run, so the entry drops to `Idle` and the
    /// next `ensure` picks it up.
    fn begin(&mut self, key: &str, next_seq: &mut u64) -> Effects<T> {
        let Some(fetcher) = self.fetcher.clone() else {
            self.entry.status = FetchStatus::Idle;
            return Effects {
                notify: vec![self.snapshot()],
                launch: None,
            };
        };

        *next_seq += 1;
        self.flight = Some(*next_seq);
        self.entry.status = FetchStatus::Loading;
        Effects {
            notify: vec![self.snapshot()],
            launch: Some(Launch {
                key: key.to_string(),
                fetcher,
                flight: *next_seq,
                generation: self.entry.generation,
            }),
        }
    }
}

/// Shared handle to the cache. Clones refer to the same map.
pub struct SyncStore<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for SyncStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Default for SyncStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> SyncStore<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                slots: HashMap::new(),
                next_seq: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        lock(&self.inner)
    }

    /// Current state of `key`. Unknown keys read as idle and empty.
    pub fn read(&self, key: &str) -> CacheEntry<T> {
        self.lock()
            .slots
            .get(key)
            .map(|slot| slot.entry.clone())
            .unwrap_or_default()
    }

    pub fn is_fetching(&self, key: &str) -> bool {
        self.lock()
            .slots
            .get(key)
            .is_some_and(|slot| slot.flight.is_some())
    }

    /// Record `fetcher` for `key` and fetch if the key is idle or failed.
    ///
    /// The fetch runs as a task on the current tokio runtime. Called outside
    /// one, the key moves straight to `Error` with `NO_RUNTIME_MESSAGE`.
    pub fn ensure(&self, key: &str, fetcher: Fetcher<T>) {
        let effects = {
            let mut guard = self.lock();
            let Inner { slots, next_seq } = &mut *guard;
            let slot = slots.entry(key.to_string()).or_default();
            slot.fetcher = Some(fetcher);

            if slot.flight.is_some() {
                trace!(key, "fetch already in flight");
                return;
            }
            if !matches!(slot.entry.status, FetchStatus::Idle | FetchStatus::Error) {
                return;
            }
            slot.begin(key, next_seq)
        };
        self.apply(effects);
    }

    /// Fetch `key` again with its recorded fetcher unless one is running.
    pub fn refetch(&self, key: &str) {
        let effects = {
            let mut guard = self.lock();
            let Inner { slots, next_seq } = &mut *guard;
            let Some(slot) = slots.get_mut(key) else {
                return;
            };
            if slot.flight.is_some() {
                return;
            }
            slot.begin(key, next_seq)
        };
        self.apply(effects);
    }

    /// Mark `key` outdated.
    ///
    /// With nothing in flight a fetch starts immediately. Otherwise the
    /// running fetch becomes stale and a single follow-up is started when it
    /// returns.
    pub fn invalidate(&self, key: &str) {
        let effects = {
            let mut guard = self.lock();
            let Inner { slots, next_seq } = &mut *guard;
            let slot = slots.entry(key.to_string()).or_default();
            slot.entry.generation += 1;

            if slot.flight.is_some() {
                debug!(
                    key,
                    generation = slot.entry.generation,
                    "invalidated during fetch, follow-up scheduled"
                );
                return;
            }
            slot.begin(key, next_seq)
        };
        self.apply(effects);
    }

    /// Register `listener` for every transition of `key`.
    pub fn subscribe<F>(&self, key: &str, listener: F) -> Subscription<T>
    where
        F: Fn(&CacheEntry<T>) + Send + Sync + 'static,
    {
        let mut guard = self.lock();
        guard.next_seq += 1;
        let id = guard.next_seq;
        guard
            .slots
            .entry(key.to_string())
            .or_default()
            .listeners
            .push((id, Arc::new(listener)));

        Subscription {
            store: Arc::downgrade(&self.inner),
            key: key.to_string(),
            id,
        }
    }

    /// Subscribe through a channel. Dropping the `Watch` unsubscribes.
    ///
    /// Only the most recent entry is kept, so an unpolled `Watch` holds one
    /// snapshot no matter how many transitions happen.
    pub fn watch(&self, key: &str) -> Watch<T>
    where
        T: Sync,
    {
        let (tx, rx) = watch::channel(None);
        let subscription = self.subscribe(key, move |entry| {
            tx.send_replace(Some(entry.clone()));
        });
        Watch { subscription, rx }
    }

    /// Wait until no fetch is in flight for `key`, then return its entry.
    pub async fn settled(&self, key: &str) -> CacheEntry<T>
    where
        T: Sync,
    {
        let mut watch = self.watch(key);
        while self.is_fetching(key) {
            if watch.changed().await.is_none() {
                break;
            }
        }
        self.read(key)
    }

    /// Drop every cached entry and fetcher, keeping listeners. Meant for
    /// resetting between tests.
    ///
    /// Generations keep counting up so a fetch that was running before the
    /// reset cannot write into the fresh entry. That fetch's task is not
    /// cancelled, though: an `ensure` right after `clear` starts a new fetch
    /// while the old one is still running, so for a moment two fetches for the
    /// same key are in flight. Only the new one's result is applied.
    pub fn clear(&self) {
        let effects = {
            let mut guard = self.lock();
            let mut effects = Effects::default();
            for slot in guard.slots.values_mut() {
                slot.entry = CacheEntry {
                    generation: slot.entry.generation + 1,
                    ..CacheEntry::default()
                };
                slot.fetcher = None;
                slot.flight = None;
                effects.notify.push(slot.snapshot());
            }
            effects
        };
        self.apply(effects);
    }

    fn apply(&self, effects: Effects<T>) {
        for (listeners, entry) in &effects.notify {
            for listener in listeners {
                listener(entry);
            }
        }
        if let Some(launch) = effects.launch {
            self.launch(launch);
        }
    }

    fn launch(&self, launch: Launch<T>) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(key = %launch.key, "no tokio runtime, fetch not started");
            self.complete(
                &launch.key,
                launch.flight,
                launch.generation,
                Err(ApiError::network(NO_RUNTIME_MESSAGE)),
            );
            return;
        };

        debug!(key = %launch.key, generation = launch.generation, "fetch started");
        let future = AssertUnwindSafe((launch.fetcher)()).catch_unwind();
        let inner = Arc::downgrade(&self.inner);

        runtime.spawn(async move {
            let result = future.await.unwrap_or_else(|_| {
                warn!(key = %launch.key, "fetch panicked");
                Err(ApiError::network(FETCH_PANICKED_MESSAGE))
            });
            if let Some(inner) = inner.upgrade() {
                SyncStore { inner }.complete(&launch.key, launch.flight, launch.generation, result);
            }
        });
    }

    fn complete(&self, key: &str, flight: u64, generation: u64, result: ApiResult<T>) {
        let effects = {
            let mut guard = self.lock();
            let Inner { slots, next_seq } = &mut *guard;
            let Some(slot) = slots.get_mut(key) else {
                return;
            };
            if slot.flight != Some(flight) {
                trace!(key, "response from a cleared fetch dropped");
                return;
            }
            slot.flight = None;

            if generation != slot.entry.generation {
                debug!(
                    key,
                    generation,
                    current = slot.entry.generation,
                    "stale response discarded"
                );
                slot.begin(key, next_seq)
            } else {
                match result {
                    Ok(data) => {
                        slot.entry.data = Some(data);
                        slot.entry.status = FetchStatus::Success;
                        slot.entry.error = None;
                    }
                    Err(e) => {
                        debug!(key, error = %e, "fetch failed");
                        slot.entry.status = FetchStatus::Error;
                        slot.entry.error = Some(e.message());
                    }
                }
                Effects {
                    notify: vec![slot.snapshot()],
                    launch: None,
                }
            }
        };
        self.apply(effects);
    }
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by `SyncStore::subscribe`.
pub struct Subscription<T> {
    store: Weak<Mutex<Inner<T>>>,
    key: String,
    id: u64,
}

impl<T> Subscription<T> {
    /// Remove this registration. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        let Some(inner) = self.store.upgrade() else {
            return;
        };
        let mut guard = lock(&inner);
        if let Some(slot) = guard.slots.get_mut(&self.key) {
            slot.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Channel-backed subscription.
pub struct Watch<T> {
    subscription: Subscription<T>,
    rx: watch::Receiver<Option<CacheEntry<T>>>,
}

impl<T: Clone> Watch<T> {
    /// Latest entry published since the last call, or `None` once the store
    /// is gone. Transitions in between are skipped.
    pub async fn changed(&mut self) -> Option<CacheEntry<T>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

impl<T> Drop for Watch<T> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
