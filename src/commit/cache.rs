//! Bounded in-memory cache of model responses.
//!
//! Eviction is least-frequently-used, not least-recently-used: when full, the
//! entry with the fewest hits goes, however recently it was written. Entries
//! older than the TTL are dropped on lookup.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::commit::types::ModelResponse;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: ModelResponse,
    timestamp: Instant,
    hit_count: u64,
    /// Insertion order, used to break hit-count ties (oldest goes first).
    seq: u64,
}

/// LFU + TTL cache keyed by [`cache_key`](crate::commit::prompt::cache_key).
///
/// Not synchronized; the analyzer serializes access behind a mutex.
#[derive(Debug)]
pub struct CommitCache {
    entries: HashMap<String, CacheEntry>,
    max_size: usize,
    ttl: Duration,
    next_seq: u64,
}

impl CommitCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            ttl,
            next_seq: 0,
        }
    }

    /// Look up a live entry, counting the hit and refreshing its timestamp.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<ModelResponse> {
        let now = Instant::now();
        let entry = self.entries.get_mut(key)?;

        if now.duration_since(entry.timestamp) > self.ttl {
            debug!("Cache entry expired");
            self.entries.remove(key);
            return None;
        }

        entry.hit_count += 1;
        entry.timestamp = now;
        Some(entry.response.clone())
    }

    /// Insert or overwrite an entry.
    ///
    /// Inserting a new key into a full cache first evicts the entry with the
    /// lowest hit count, oldest insertion first on ties. Overwriting an
    /// existing key never evicts.
    pub fn set(&mut self, key: impl Into<String>, response: ModelResponse) {
        let key = key.into();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_least_frequent();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            CacheEntry {
                response,
                timestamp: Instant::now(),
                hit_count: 1,
                seq,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current hit count of an entry, without counting as an access.
    pub fn hit_count(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|e| e.hit_count)
    }

    fn evict_least_frequent(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.hit_count, e.seq))
            .map(|(k, _)| k.clone());

        if let Some(key) = victim {
            debug!("Evicting least frequently used cache entry");
            self.entries.remove(&key);
        }
    }
}
