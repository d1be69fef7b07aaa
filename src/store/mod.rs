//! Status Tree Store
//!
//! In-memory cache mapping absolute paths to their last known status and the
//! generation (age) of the batch that produced it. Entries live in an ordered
//! map keyed by path; component-wise path ordering keeps every subtree in one
//! contiguous key range, so subtree lookups and invalidations are range scans.
//!
//! Every public method takes the store lock exactly once and delegates to the
//! unlocked helpers on [`StoreInner`], so multi-step sequences such as
//! invalidate-then-repopulate run inside a single critical section.

use crate::status::StatusValue;
use crate::types::{is_under, StatusMap};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default upper bound on the number of cached entries
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1_000_000;

/// Cached status of one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: StatusValue,
    /// Generation of the batch that wrote this entry (higher = newer)
    pub age: u64,
}

/// Point-in-time view of store occupancy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub entries: usize,
    pub generations: usize,
    pub min_age: Option<u64>,
    pub max_age: u64,
    pub max_size: usize,
}

/// Unsynchronized store state; only reachable through the lock
#[derive(Debug, Default)]
struct StoreInner {
    entries: BTreeMap<PathBuf, CacheEntry>,
    /// Live entry count per generation
    generations: BTreeMap<u64, usize>,
    /// Last age handed out; never decreases
    max_age: u64,
}

impl StoreInner {
    fn subtree_keys(&self, path: &Path) -> Vec<PathBuf> {
        self.entries
            .range::<Path, _>((Bound::Included(path), Bound::Unbounded))
            .take_while(|(other, _)| is_under(path, other))
            .map(|(other, _)| other.clone())
            .collect()
    }

    fn get(&self, path: &Path, recurse: bool) -> Option<StatusMap> {
        let entry = self.entries.get(path)?;

        if !recurse {
            let mut statuses = StatusMap::new();
            statuses.insert(path.to_path_buf(), entry.status);
            return Some(statuses);
        }

        Some(
            self.entries
                .range::<Path, _>((Bound::Included(path), Bound::Unbounded))
                .take_while(|(other, _)| is_under(path, other))
                .map(|(other, entry)| (other.clone(), entry.status))
                .collect(),
        )
    }

    fn release(&mut self, age: u64) {
        if let Some(count) = self.generations.get_mut(&age) {
            *count -= 1;
            if *count == 0 {
                self.generations.remove(&age);
            }
        }
    }

    fn remove(&mut self, path: &Path) -> Option<CacheEntry> {
        let entry = self.entries.remove(path)?;
        self.release(entry.age);
        Some(entry)
    }

    fn invalidate(&mut self, path: &Path) -> usize {
        let keys = self.subtree_keys(path);
        for key in &keys {
            self.remove(key);
        }
        keys.len()
    }

    fn add_batch<I>(&mut self, entries: I) -> u64
    where
        I: IntoIterator<Item = (PathBuf, StatusValue)>,
    {
        self.max_age += 1;
        let age = self.max_age;

        for (path, status) in entries {
            if let Some(previous) = self.entries.insert(path, CacheEntry { status, age }) {
                self.release(previous.age);
            }
            *self.generations.entry(age).or_insert(0) += 1;
        }

        age
    }

    /// Drop whole generations, oldest first, until the bound holds or one
    /// generation remains.
    fn clean(&mut self, max_size: usize) -> usize {
        let mut removed = 0;

        while self.entries.len() > max_size {
            let (min_age, max_age) = match (
                self.generations.first_key_value(),
                self.generations.last_key_value(),
            ) {
                (Some((min, _)), Some((max, _))) => (*min, *max),
                _ => break,
            };
            if min_age == max_age {
                break;
            }

            let before = self.entries.len();
            self.entries.retain(|_, entry| entry.age != min_age);
            self.generations.remove(&min_age);
            let evicted = before - self.entries.len();
            removed += evicted;

            debug!(
                age = min_age,
                evicted,
                remaining = self.entries.len(),
                "Evicted generation from status cache"
            );
        }

        removed
    }
}

/// Thread-safe status cache keyed by absolute path
#[derive(Debug)]
pub struct StatusTreeStore {
    inner: Mutex<StoreInner>,
    max_size: usize,
}

impl Default for StatusTreeStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_SIZE)
    }
}

impl StatusTreeStore {
    /// Create an empty store bounded to `max_size` entries
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            max_size,
        }
    }

    /// Look up `path`, or its whole subtree when `recurse` is set
    ///
    /// Returns `None` when `path` itself has no entry, even if entries exist
    /// below it; callers use this to tell "no data yet" from "empty subtree".
    pub fn get(&self, path: &Path, recurse: bool) -> Option<StatusMap> {
        self.inner.lock().get(path, recurse)
    }

    /// Cached entry for exactly `path`
    pub fn get_entry(&self, path: &Path) -> Option<CacheEntry> {
        self.inner.lock().entries.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.lock().entries.contains_key(path)
    }

    /// Remove `path` and everything below it; returns the number removed
    pub fn invalidate(&self, path: &Path) -> usize {
        let removed = self.inner.lock().invalidate(path);
        debug!(path = %path.display(), removed, "Invalidated status subtree");
        removed
    }

    /// Insert a batch stamped with a fresh generation, then evict
    ///
    /// Returns the age assigned to the batch.
    pub fn add_batch<I>(&self, entries: I) -> u64
    where
        I: IntoIterator<Item = (PathBuf, StatusValue)>,
    {
        let mut inner = self.inner.lock();
        let age = inner.add_batch(entries);
        inner.clean(self.max_size);
        age
    }

    /// Insert a batch and read `path` back within one critical section
    pub fn add_batch_and_get<I>(&self, path: &Path, entries: I, recurse: bool) -> Option<StatusMap>
    where
        I: IntoIterator<Item = (PathBuf, StatusValue)>,
    {
        let mut inner = self.inner.lock();
        inner.add_batch(entries);
        inner.clean(self.max_size);
        inner.get(path, recurse)
    }

    /// Replace the subtree at `path` with a freshly computed batch
    ///
    /// Invalidation, insertion and read-back happen under one lock, so no
    /// reader ever sees the subtree transiently missing.
    pub fn replace_subtree<I>(&self, path: &Path, entries: I, recurse: bool) -> Option<StatusMap>
    where
        I: IntoIterator<Item = (PathBuf, StatusValue)>,
    {
        let mut inner = self.inner.lock();
        let removed = inner.invalidate(path);
        inner.add_batch(entries);
        inner.clean(self.max_size);
        debug!(path = %path.display(), removed, "Replaced status subtree");
        inner.get(path, recurse)
    }

    /// Evict oldest generations while over the size bound
    ///
    /// Never splits a generation: if the newest remaining generation alone
    /// exceeds the bound, the store is left over the bound.
    pub fn clean(&self) -> usize {
        self.inner.lock().clean(self.max_size)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Smallest age currently present
    pub fn min_age(&self) -> Option<u64> {
        self.inner
            .lock()
            .generations
            .first_key_value()
            .map(|(age, _)| *age)
    }

    /// Last age handed out, zero before the first batch
    pub fn max_age(&self) -> u64 {
        self.inner.lock().max_age
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            entries: inner.entries.len(),
            generations: inner.generations.len(),
            min_age: inner.generations.first_key_value().map(|(age, _)| *age),
            max_age: inner.max_age,
            max_size: self.max_size,
        }
    }
}
