//! In-memory cache tier with LRU eviction
//!
//! Tier-1 of the response cache. All mutation happens behind the store's
//! RwLock; this type itself is plain data plus bookkeeping. Expired
//! entries are deliberately kept until purged so stale-tolerant reads
//! have something to serve.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::cache::entry::CacheEntry;
use crate::cache::types::CacheKey;

/// In-memory storage with LRU access tracking
pub struct MemoryTier {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// LRU tracking: maintains access order, oldest at the front
    lru_queue: VecDeque<CacheKey>,

    /// Maximum number of entries before LRU eviction kicks in
    max_entries: usize,
}

impl MemoryTier {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            max_entries,
        }
    }

    /// Look up an entry, refreshing its LRU position on hit
    ///
    /// Staleness is the caller's concern; an expired entry is still
    /// returned here.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        if self.entries.contains_key(key) {
            self.touch(key);
        }
        self.entries.get(key)
    }

    /// Insert or overwrite an entry, evicting LRU entries if needed
    ///
    /// Returns the number of entries evicted to make room.
    pub fn insert(&mut self, entry: CacheEntry) -> u64 {
        let key = entry.key.clone();
        let mut evicted = 0;

        if self.entries.insert(key.clone(), entry).is_some() {
            // Overwrite: refresh LRU position only
            self.touch(&key);
        } else {
            self.lru_queue.push_back(key);
            while self.entries.len() > self.max_entries {
                if let Some(oldest) = self.lru_queue.pop_front() {
                    self.entries.remove(&oldest);
                    evicted += 1;
                } else {
                    break;
                }
            }
        }

        evicted
    }

    /// Remove an entry; returns whether anything was removed
    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru_queue.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    /// Remove every entry produced by a collaborator; returns the count
    pub fn remove_by_source(&mut self, source_tag: &str) -> usize {
        let keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.source_tag == source_tag)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            self.entries.remove(key);
        }
        self.lru_queue.retain(|k| !keys.contains(k));

        keys.len()
    }

    /// Remove entries expired longer than `grace` ago; returns the count
    pub fn purge_expired(&mut self, grace: Duration) -> usize {
        let keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_past_grace(grace))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            self.entries.remove(key);
        }
        self.lru_queue.retain(|k| !keys.contains(k));

        keys.len()
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the tier is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move a key to the back of the LRU queue (most recently used)
    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }
}
