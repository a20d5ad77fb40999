//! In-memory processing cache
//!
//! `ProcessingCache` is a bounded LRU ordered by insertion. Lookups do not
//! refresh an entry; putting the same fingerprint again does. Entries never
//! expire on their own.

use std::collections::{BTreeMap, HashMap};

use super::entry::{CacheEntry, CachedResult};
use super::fingerprint::Fingerprint;
use super::stats::{CacheStats, CacheStatsTracker};

/// Bounded map from fingerprint to encoded output.
#[derive(Debug)]
pub struct ProcessingCache {
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Insertion counter -> fingerprint, oldest first.
    order: BTreeMap<u64, Fingerprint>,
    next_seq: u64,
    capacity: usize,
    stats: CacheStatsTracker,
}

impl ProcessingCache {
    /// Create a cache holding at most `capacity` entries.
    /// A capacity of zero stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            next_seq: 0,
            capacity,
            stats: CacheStatsTracker::new(),
        }
    }

    /// Look up a finished result.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CachedResult> {
        match self.entries.get(fingerprint) {
            Some(entry) => {
                self.stats.increment_hits();
                tracing::debug!(fingerprint = %fingerprint, "cache hit");
                Some(entry.result.clone())
            }
            None => {
                self.stats.increment_misses();
                tracing::debug!(fingerprint = %fingerprint, "cache miss");
                None
            }
        }
    }

    /// Whether an entry exists, without touching the statistics.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Store a result, evicting the oldest entries when full.
    pub fn put(&mut self, fingerprint: Fingerprint, result: CachedResult) {
        if self.capacity == 0 {
            return;
        }

        if let Some(previous) = self.entries.remove(&fingerprint) {
            self.order.remove(&previous.created_at);
        }

        while self.entries.len() >= self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.increment_evictions();
            tracing::debug!(fingerprint = %oldest, "cache eviction");
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, fingerprint);
        self.entries
            .insert(fingerprint, CacheEntry::new(fingerprint, result, seq));
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fingerprints from oldest to newest.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.order.values().copied().collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len(), self.capacity)
    }
}
