//! Single-flight cache coordinator.
//!
//! Owns one cached sequence, its write-through mirror in persistent storage,
//! and the load state. Concurrent callers that arrive while a load is running
//! attach to that load's shared future instead of starting another, so a
//! refresh cycle costs exactly one producer call.
//!
//! Loads run on their own task and always complete, even when every caller
//! has gone away. A [`clear`](SingleFlightCache::clear) during a load bumps the
//! generation: the load's waiters still get its result, but it is not written
//! back into the cleared cache.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use adsplat_store::KvStore;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::ClientError;
use crate::session::{Invalidate, SessionGate};

/// Produces a fresh copy of the cached sequence.
#[async_trait]
pub trait Loader<T>: Send + Sync {
    async fn load(&self) -> Result<Vec<T>, ClientError>;

    /// Called after a loaded sequence has been stored. Not called for a load
    /// whose cache was cleared while it ran.
    fn on_kept(&self, _items: &[T]) {}
}

/// Names, storage keys and lifetime of one cache instance.
#[derive(Debug, Clone)]
pub struct CacheSpec {
    pub name: &'static str,
    pub value_key: &'static str,
    pub timestamp_key: &'static str,
    pub ttl: Duration,
}

/// Snapshot of the cache for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub has_cache: bool,
    /// Age of the persisted copy in whole minutes.
    pub age_minutes: Option<i64>,
    pub count: usize,
}

type Flight<T> = Shared<BoxFuture<'static, Arc<Vec<T>>>>;

struct LoadState<T> {
    value: Arc<Vec<T>>,
    loaded_at: Option<i64>,
    has_loaded: bool,
    inflight: Option<Flight<T>>,
    generation: u64,
}

impl<T> LoadState<T> {
    fn is_fresh(&self, ttl: Duration, now: i64) -> bool {
        self.has_loaded && self.loaded_at.is_some_and(|at| within_ttl(at, now, ttl))
    }
}

struct Inner<T> {
    spec: CacheSpec,
    store: Arc<dyn KvStore>,
    session: Arc<SessionGate>,
    loader: Arc<dyn Loader<T>>,
    state: Mutex<LoadState<T>>,
    dependents: Mutex<Vec<Weak<dyn Invalidate>>>,
}

pub struct SingleFlightCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SingleFlightCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SingleFlightCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Build the coordinator, hydrating from a fresh persisted copy if there is
    /// one and discarding a stale one. Subscribes to sign-out.
    pub fn new(
        spec: CacheSpec,
        store: Arc<dyn KvStore>,
        session: Arc<SessionGate>,
        loader: Arc<dyn Loader<T>>,
    ) -> Self {
        let inner = Arc::new(Inner {
            spec,
            store,
            session,
            loader,
            state: Mutex::new(LoadState {
                value: Arc::new(Vec::new()),
                loaded_at: None,
                has_loaded: false,
                inflight: None,
                generation: 0,
            }),
            dependents: Mutex::new(Vec::new()),
        });

        inner.hydrate();
        inner.session.subscribe(Self::invalidator(&inner));

        Self { inner }
    }

    fn invalidator(inner: &Arc<Inner<T>>) -> Weak<dyn Invalidate> {
        Arc::downgrade(inner) as Weak<dyn Invalidate>
    }

    /// Invalidate `dependent` whenever this cache is cleared or force-refreshed.
    pub fn add_dependent<U>(&self, dependent: &SingleFlightCache<U>)
    where
        U: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        if let Ok(mut deps) = self.inner.dependents.lock() {
            deps.push(SingleFlightCache::<U>::invalidator(&dependent.inner));
        }
    }

    /// Return the cached sequence, loading it first when needed.
    ///
    /// With `force_refresh` the cached and persisted copies are dropped first.
    /// While a load is running every caller receives that load's result.
    /// Without a session the result is empty and nothing is marked loaded.
    pub async fn get(&self, force_refresh: bool) -> Arc<Vec<T>> {
        let name = self.inner.spec.name;

        let flight = {
            let mut state = self.inner.lock_state();

            if force_refresh {
                debug!(cache = name, "force refresh, dropping cached copy");
                state.value = Arc::new(Vec::new());
                state.loaded_at = None;
                state.has_loaded = false;
                self.inner.remove_persisted();
            }

            if let Some(flight) = &state.inflight {
                debug!(cache = name, "load in flight, waiting for it");
                flight.clone()
            } else if state.is_fresh(self.inner.spec.ttl, now_millis()) {
                debug!(cache = name, count = state.value.len(), "cache hit");
                return Arc::clone(&state.value);
            } else if !self.inner.session.is_authorized() {
                debug!(cache = name, "not signed in, returning empty");
                return Arc::new(Vec::new());
            } else {
                self.start_flight(&mut state)
            }
        };

        if force_refresh {
            self.inner.invalidate_dependents();
        }

        flight.await
    }

    fn start_flight(&self, state: &mut LoadState<T>) -> Flight<T> {
        debug!(cache = self.inner.spec.name, "starting load");

        let inner = Arc::clone(&self.inner);
        let generation = state.generation;
        let task = tokio::spawn(async move { inner.run_load(generation).await });

        let inner = Arc::clone(&self.inner);
        let flight = async move {
            match task.await {
                Ok(value) => value,
                Err(e) => {
                    error!(cache = inner.spec.name, error = %e, "load task died");
                    Arc::clone(&inner.lock_state().value)
                }
            }
        }
        .boxed()
        .shared();

        state.inflight = Some(flight.clone());
        flight
    }

    /// Drop the cached and persisted copies and reset the load state.
    pub fn clear(&self) {
        self.inner.invalidate();
    }

    /// The cached sequence, without loading.
    pub fn cached(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.inner.lock_state().value)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock_state().inflight.is_some()
    }

    pub fn has_loaded(&self) -> bool {
        self.inner.lock_state().has_loaded
    }

    pub fn cache_info(&self) -> CacheInfo {
        let state = self.inner.lock_state();
        let persisted_at = self.inner.persisted_timestamp();

        match persisted_at {
            Some(at) if state.has_loaded => CacheInfo {
                has_cache: true,
                age_minutes: Some(now_millis().saturating_sub(at) / 60_000),
                count: state.value.len(),
            },
            _ => CacheInfo {
                has_cache: false,
                age_minutes: None,
                count: state.value.len(),
            },
        }
    }
}

impl<T> Inner<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, LoadState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_load(self: Arc<Self>, generation: u64) -> Arc<Vec<T>> {
        let _release = FlightRelease {
            inner: Arc::clone(&self),
            generation,
        };

        let result = self.loader.load().await;

        let mut state = self.lock_state();
        let current = state.generation == generation;

        match result {
            Ok(items) => {
                let items = Arc::new(items);
                if !current {
                    debug!(cache = self.spec.name, "cleared during load, result not kept");
                    return items;
                }

                let now = now_millis();
                state.value = Arc::clone(&items);
                state.loaded_at = Some(now);
                state.has_loaded = true;
                self.persist(&items, now);
                drop(state);

                info!(cache = self.spec.name, count = items.len(), "loaded");
                self.loader.on_kept(&items);
                items
            }
            Err(e) => {
                warn!(
                    cache = self.spec.name,
                    error = %e,
                    cached = state.value.len(),
                    "load failed, serving cached value"
                );
                Arc::clone(&state.value)
            }
        }
    }

    fn hydrate(&self) {
        let name = self.spec.name;
        let Some(at) = self.persisted_timestamp() else {
            debug!(cache = name, "no persisted copy");
            self.remove_persisted();
            return;
        };

        let now = now_millis();
        if !within_ttl(at, now, self.spec.ttl) {
            info!(cache = name, age_ms = now.saturating_sub(at), "persisted copy expired, discarding");
            self.remove_persisted();
            return;
        }

        let raw = match self.store.get(self.spec.value_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.remove_persisted();
                return;
            }
            Err(e) => {
                error!(cache = name, error = %e, "failed to read persisted copy");
                return;
            }
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => {
                let mut state = self.lock_state();
                info!(cache = name, count = items.len(), age_minutes = now.saturating_sub(at) / 60_000, "hydrated from storage");
                state.value = Arc::new(items);
                state.loaded_at = Some(at);
                state.has_loaded = true;
            }
            Err(e) => {
                warn!(cache = name, error = %e, "persisted copy unreadable, discarding");
                self.remove_persisted();
            }
        }
    }

    fn persisted_timestamp(&self) -> Option<i64> {
        match self.store.get(self.spec.timestamp_key) {
            Ok(raw) => raw.and_then(|r| r.trim().parse().ok()),
            Err(e) => {
                error!(cache = self.spec.name, error = %e, "failed to read cache timestamp");
                None
            }
        }
    }

    fn persist(&self, items: &[T], now: i64) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                error!(cache = self.spec.name, error = %e, "failed to serialize cache");
                return;
            }
        };

        let written = self
            .store
            .set(self.spec.value_key, &json)
            .and_then(|_| self.store.set(self.spec.timestamp_key, &now.to_string()));
        if let Err(e) = written {
            error!(cache = self.spec.name, error = %e, "failed to persist cache");
        }
    }

    fn remove_persisted(&self) {
        for key in [self.spec.value_key, self.spec.timestamp_key] {
            if let Err(e) = self.store.remove(key) {
                error!(cache = self.spec.name, key, error = %e, "failed to remove persisted cache");
            }
        }
    }

    fn invalidate_dependents(&self) {
        let deps: Vec<Arc<dyn Invalidate>> = self
            .dependents
            .lock()
            .map(|d| d.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default();
        for dep in deps {
            dep.invalidate();
        }
    }
}

impl<T> Invalidate for Inner<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn invalidate(&self) {
        {
            let mut state = self.lock_state();
            state.value = Arc::new(Vec::new());
            state.loaded_at = None;
            state.has_loaded = false;
            state.inflight = None;
            state.generation += 1;
        }
        self.remove_persisted();
        debug!(cache = self.spec.name, "cleared");

        self.invalidate_dependents();
    }
}

/// Clears the in-flight marker when a load ends, however it ends.
struct FlightRelease<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    inner: Arc<Inner<T>>,
    generation: u64,
}

impl<T> Drop for FlightRelease<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn drop(&mut self) {
        let mut state = self.inner.lock_state();
        if state.generation == self.generation {
            state.inflight = None;
        }
    }
}

/// A timestamp in the future or too far in the past to subtract is stale.
fn within_ttl(at: i64, now: i64, ttl: Duration) -> bool {
    match now.checked_sub(at) {
        Some(age) if age >= 0 => (age as u128) < ttl.as_millis(),
        _ => false,
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
