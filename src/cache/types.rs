//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type: `{collaborator}:{query_type}:{12-hex-hash}`
pub type CacheKey = String;

/// Statistics and metrics for cache performance monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Hits served from the in-memory tier
    pub memory_hits: u64,

    /// Hits served from the durable tier (and promoted)
    pub disk_hits: u64,

    /// Total cache misses
    pub misses: u64,

    /// Expired entries served through stale-tolerant reads
    pub stale_serves: u64,

    /// Tier-2 entries promoted into tier-1 on read
    pub promotions: u64,

    /// Entries removed by explicit invalidation
    pub invalidations: u64,

    /// Entries evicted from the memory tier by the LRU policy
    pub evictions_lru: u64,

    /// Entries removed by expiry purges
    pub purged: u64,

    /// Number of entries currently in the memory tier
    pub memory_entries: usize,
}

impl CacheStats {
    /// Total hits across both tiers
    pub fn hits(&self) -> u64 {
        self.memory_hits + self.disk_hits
    }

    /// Cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits() as f64 / total as f64) * 100.0
        }
    }

    /// Cache miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ memory_hits: {}, disk_hits: {}, misses: {}, hit_rate: {:.2}%, stale_serves: {}, promotions: {}, invalidations: {} }}",
            self.memory_hits,
            self.disk_hits,
            self.misses,
            self.hit_rate(),
            self.stale_serves,
            self.promotions,
            self.invalidations
        )
    }
}
