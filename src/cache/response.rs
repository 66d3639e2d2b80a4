//! Single-flight response cache
//!
//! Per key the state moves `Absent → Computing → Ready`, or back to
//! `Absent` on failure. Every transition happens under one mutex that is
//! never held across an await.
//!
//! - The computation runs on its own task. A caller that stops waiting
//!   does not cancel it, and its result is still stored.
//! - Waiters of a flight all receive that flight's outcome, success or
//!   failure. Failures are not stored.
//! - Invalidating a dataset removes every slot it contributed to,
//!   including in-flight ones. A flight whose slot was removed still
//!   answers its waiters but its result is discarded.
//! - The cache tracks each dataset's current fingerprint. A lookup made
//!   with an outdated fingerprint bypasses the cache entirely.
//! - `retain_set` publishes a whole dataset set. Entries keyed on any other
//!   combined fingerprint can never be looked up again and are removed, and
//!   lookups from any other set bypass the cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::dataset::{DatasetSet, Fingerprint};
use crate::engine::EngineError;
use crate::executor::{CacheStatus, ExecutionResult};
use crate::observability::Logger;

use super::key::CacheKey;

type Outcome = Result<Arc<ExecutionResult>, EngineError>;

/// A stored result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub result: Arc<ExecutionResult>,
    pub created_at: DateTime<Utc>,
    /// (dataset, fingerprint) pairs the result was computed from
    pub datasets: Vec<(String, Fingerprint)>,
}

/// Listing view of a stored entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryInfo {
    pub question: String,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub datasets: Vec<(String, Fingerprint)>,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub shared: u64,
    pub bypassed: u64,
    /// Results that finished after their slot was invalidated
    pub discarded: u64,
    /// Slots removed by invalidation or `clear`
    pub invalidated: u64,
}

enum Slot {
    Computing {
        flight: u64,
        datasets: Vec<(String, Fingerprint)>,
        rx: watch::Receiver<Option<Outcome>>,
    },
    Ready(CacheEntry),
}

impl Slot {
    fn datasets(&self) -> &[(String, Fingerprint)] {
        match self {
            Slot::Computing { datasets, .. } => datasets,
            Slot::Ready(entry) => &entry.datasets,
        }
    }

    fn is_flight(&self, id: u64) -> bool {
        matches!(self, Slot::Computing { flight, .. } if *flight == id)
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, Slot>,
    /// Latest fingerprint known for each dataset name
    current: HashMap<String, Fingerprint>,
    /// Combined fingerprint of the published set, once `retain_set` ran
    current_set: Option<Fingerprint>,
    next_flight: u64,
    stats: CacheStats,
}

enum Lookup {
    Hit(Arc<ExecutionResult>),
    Wait(watch::Receiver<Option<Outcome>>),
    Compute {
        flight: u64,
        tx: watch::Sender<Option<Outcome>>,
        rx: watch::Receiver<Option<Outcome>>,
    },
    Bypass,
}

/// Fingerprint-keyed, single-flight cache of execution results
#[derive(Clone, Default)]
pub struct ResponseCache {
    state: Arc<Mutex<CacheState>>,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached answer to `question` over `datasets`, or runs
    /// `compute` to produce it. Concurrent callers with the same key share
    /// one computation.
    pub async fn get_or_compute<F, Fut>(
        &self,
        datasets: &DatasetSet,
        question: &str,
        compute: F,
    ) -> Result<ExecutionResult, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExecutionResult, EngineError>> + Send + 'static,
    {
        let key = CacheKey::new(datasets.fingerprint(), question);
        let contributing = datasets.fingerprints();

        match self.lookup(&key, &contributing) {
            Lookup::Hit(result) => {
                Logger::trace("CACHE_HIT", &[("key", &key.to_string())]);
                Ok(result.with_cache_status(CacheStatus::Hit))
            }
            Lookup::Wait(rx) => {
                Logger::trace("CACHE_SHARED", &[("key", &key.to_string())]);
                let result = wait(rx).await?;
                Ok(result.with_cache_status(CacheStatus::Shared))
            }
            Lookup::Compute { flight, tx, rx } => {
                Logger::trace("CACHE_MISS", &[("key", &key.to_string())]);
                self.spawn_flight(key, flight, tx, compute());
                let result = wait(rx).await?;
                Ok(result.with_cache_status(CacheStatus::Miss))
            }
            Lookup::Bypass => {
                Logger::info("CACHE_BYPASSED", &[("key", &key.to_string())]);
                let result = compute().await?;
                Ok(result.with_cache_status(CacheStatus::Bypassed))
            }
        }
    }

    fn lookup(&self, key: &CacheKey, contributing: &[(String, Fingerprint)]) -> Lookup {
        let mut guard = lock(&self.state);
        let state = &mut *guard;

        let stale = state
            .current_set
            .as_ref()
            .map_or(false, |set| *set != key.fingerprint)
            || contributing.iter().any(|(name, fp)| {
                state
                    .current
                    .get(name)
                    .map_or(false, |current| current != fp)
            });
        if stale {
            state.stats.bypassed += 1;
            return Lookup::Bypass;
        }
        for (name, fp) in contributing {
            state
                .current
                .entry(name.clone())
                .or_insert_with(|| fp.clone());
        }

        match state.entries.get(key) {
            Some(Slot::Ready(entry)) => {
                let result = Arc::clone(&entry.result);
                state.stats.hits += 1;
                Lookup::Hit(result)
            }
            Some(Slot::Computing { rx, .. }) => {
                let rx = rx.clone();
                state.stats.shared += 1;
                Lookup::Wait(rx)
            }
            None => {
                let flight = state.next_flight;
                state.next_flight += 1;
                state.stats.misses += 1;
                let (tx, rx) = watch::channel(None);
                state.entries.insert(
                    key.clone(),
                    Slot::Computing {
                        flight,
                        datasets: contributing.to_vec(),
                        rx: rx.clone(),
                    },
                );
                Lookup::Compute { flight, tx, rx }
            }
        }
    }

    fn spawn_flight<Fut>(
        &self,
        key: CacheKey,
        flight: u64,
        tx: watch::Sender<Option<Outcome>>,
        computation: Fut,
    ) where
        Fut: Future<Output = Result<ExecutionResult, EngineError>> + Send + 'static,
    {
        let guard = FlightGuard {
            state: Arc::clone(&self.state),
            key,
            flight,
            settled: false,
        };
        tokio::spawn(async move {
            let mut guard = guard;
            let outcome: Outcome = computation.await.map(Arc::new);
            guard.settle(&outcome);
            tx.send_replace(Some(outcome));
        });
    }

    /// Records `fingerprint` as the current version of `dataset` (or
    /// forgets the dataset when `None`) and removes every entry computed
    /// from another version. Returns the number of removed slots.
    pub fn invalidate_dataset(&self, dataset: &str, fingerprint: Option<&Fingerprint>) -> usize {
        let mut state = lock(&self.state);

        match fingerprint {
            Some(fp) if state.current.get(dataset) == Some(fp) => return 0,
            Some(fp) => {
                state.current.insert(dataset.to_string(), fp.clone());
            }
            None => {
                state.current.remove(dataset);
            }
        }
        state.current_set = None;

        let before = state.entries.len();
        state
            .entries
            .retain(|_, slot| !slot.datasets().iter().any(|(name, _)| name == dataset));
        let removed = before - state.entries.len();
        state.stats.invalidated += removed as u64;
        drop(state);

        if removed > 0 {
            Logger::info(
                "CACHE_INVALIDATED",
                &[("dataset", dataset), ("removed", &removed.to_string())],
            );
        }
        removed
    }

    /// Makes `datasets` the current set: remembers each member's fingerprint
    /// and removes every slot, in-flight ones included, keyed on another
    /// combined fingerprint. Returns the number of removed slots.
    pub fn retain_set(&self, datasets: &DatasetSet) -> usize {
        let set = datasets.fingerprint();
        let mut state = lock(&self.state);

        state.current = datasets.fingerprints().into_iter().collect();
        state.current_set = Some(set.clone());

        let before = state.entries.len();
        state.entries.retain(|key, _| key.fingerprint == set);
        let removed = before - state.entries.len();
        state.stats.invalidated += removed as u64;
        drop(state);

        if removed > 0 {
            Logger::info(
                "CACHE_RETIRED",
                &[("removed", &removed.to_string()), ("set", set.short())],
            );
        }
        removed
    }

    /// Drops every entry, in-flight ones included
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        let removed = state.entries.len() as u64;
        state.entries.clear();
        state.stats.invalidated += removed;
    }

    /// Stored (ready) entries, oldest first
    pub fn entries(&self) -> Vec<CacheEntryInfo> {
        let state = lock(&self.state);
        let mut entries: Vec<CacheEntryInfo> = state
            .entries
            .values()
            .filter_map(|slot| match slot {
                Slot::Ready(entry) => Some(CacheEntryInfo {
                    question: entry.key.question.clone(),
                    fingerprint: entry.key.fingerprint.clone(),
                    created_at: entry.created_at,
                    datasets: entry.datasets.clone(),
                }),
                Slot::Computing { .. } => None,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.question.cmp(&b.question))
        });
        entries
    }

    /// Number of ready entries
    pub fn len(&self) -> usize {
        lock(&self.state)
            .entries
            .values()
            .filter(|s| matches!(s, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Computations currently running
    pub fn in_flight(&self) -> usize {
        lock(&self.state)
            .entries
            .values()
            .filter(|s| matches!(s, Slot::Computing { .. }))
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.state).stats
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Moves a flight's slot to its final state. If the computation panics or
/// is aborted before settling, dropping the guard frees the slot.
struct FlightGuard {
    state: Arc<Mutex<CacheState>>,
    key: CacheKey,
    flight: u64,
    settled: bool,
}

impl FlightGuard {
    fn settle(&mut self, outcome: &Outcome) {
        self.settled = true;
        let mut state = lock(&self.state);
        let ours = state
            .entries
            .get(&self.key)
            .map_or(false, |slot| slot.is_flight(self.flight));

        match outcome {
            Ok(result) if ours => {
                let datasets = state
                    .entries
                    .get(&self.key)
                    .map(|slot| slot.datasets().to_vec())
                    .unwrap_or_default();
                state.entries.insert(
                    self.key.clone(),
                    Slot::Ready(CacheEntry {
                        key: self.key.clone(),
                        result: Arc::clone(result),
                        created_at: Utc::now(),
                        datasets,
                    }),
                );
            }
            Ok(_) => {
                state.stats.discarded += 1;
                drop(state);
                Logger::info("CACHE_RESULT_DISCARDED", &[("key", &self.key.to_string())]);
            }
            Err(_) if ours => {
                state.entries.remove(&self.key);
            }
            Err(_) => {}
        }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock(&self.state);
        let ours = state
            .entries
            .get(&self.key)
            .map_or(false, |slot| slot.is_flight(self.flight));
        if ours {
            state.entries.remove(&self.key);
        }
    }
}

async fn wait(mut rx: watch::Receiver<Option<Outcome>>) -> Outcome {
    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(outcome) = current {
            return outcome;
        }
        if rx.changed().await.is_err() {
            // Sender gone: either it sent just before dropping or it died
            let last = rx.borrow().clone();
            return last.unwrap_or_else(|| {
                Err(EngineError::Internal(
                    "computation ended without a result".into(),
                ))
            });
        }
    }
}
