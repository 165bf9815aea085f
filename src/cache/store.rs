//! Two-tier response cache with TTL expiry and stale-while-revalidate reads
//!
//! Tier-1 is an in-memory map with LRU eviction; tier-2 is durable SQLite.
//! Reads check tier-1 first and promote tier-2 hits. Durability is
//! best-effort: a failed durable write leaves the in-memory write valid
//! for the remainder of the process lifetime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::config::CacheConfig;
use crate::cache::entry::{CacheEntry, StaleEntry};
use crate::cache::disk::DiskTier;
use crate::cache::memory::MemoryTier;
use crate::cache::types::{CacheKey, CacheStats};
use crate::error::{ArgusError, Result};

/// Two-tier cache for provider responses
pub struct ResponseCache {
    config: CacheConfig,

    /// Tier-1 storage and statistics, guarded together
    inner: RwLock<CacheInner>,

    /// Tier-2 durable storage (single shared connection)
    disk: DiskTier,
}

struct CacheInner {
    memory: MemoryTier,
    stats: CacheStats,
}

impl ResponseCache {
    /// Open a cache with the given configuration
    pub fn open(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(ArgusError::Config)?;
        info!("Initializing response cache at {:?}", config.db_path);

        let disk = DiskTier::open(&config.db_path)?;
        Ok(Self::with_disk(config, disk))
    }

    /// Cache whose durable tier lives in memory (tests, ephemeral runs)
    pub fn ephemeral(config: CacheConfig) -> Result<Self> {
        config.validate().map_err(ArgusError::Config)?;
        let disk = DiskTier::open_in_memory()?;
        Ok(Self::with_disk(config, disk))
    }

    fn with_disk(config: CacheConfig, disk: DiskTier) -> Self {
        let inner = CacheInner {
            memory: MemoryTier::new(config.max_memory_entries),
            stats: CacheStats::default(),
        };

        Self {
            config,
            inner: RwLock::new(inner),
            disk,
        }
    }

    /// Look up a fresh entry
    ///
    /// Tier-1 first; on miss, tier-2, promoting any hit into tier-1.
    /// An expired entry is treated as absent. A miss is a normal
    /// outcome, never an error.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut inner = self.inner.write().await;

        if let Some(entry) = inner.memory.get(key) {
            if !entry.is_stale() {
                let entry = entry.clone();
                inner.stats.memory_hits += 1;
                debug!("Cache hit (memory): {}", key);
                return Ok(Some(entry));
            }
            // Expired in tier-1; tier-2 holds the same generation
            inner.stats.misses += 1;
            debug!("Cache miss (expired): {}", key);
            return Ok(None);
        }

        match self.disk.get(key)? {
            Some(entry) if !entry.is_stale() => {
                inner.stats.disk_hits += 1;
                inner.stats.promotions += 1;
                inner.memory.insert(entry.clone());
                inner.stats.memory_entries = inner.memory.len();
                debug!("Cache hit (disk, promoted): {}", key);
                Ok(Some(entry))
            }
            Some(_) => {
                inner.stats.misses += 1;
                debug!("Cache miss (expired on disk): {}", key);
                Ok(None)
            }
            None => {
                inner.stats.misses += 1;
                debug!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    /// Look up an entry, serving it even when expired
    ///
    /// An expired entry is returned with `is_stale: true` rather than
    /// treated as absent. Every stale serve is logged at WARN.
    pub async fn get_stale(&self, key: &str) -> Result<Option<StaleEntry>> {
        let mut inner = self.inner.write().await;

        let (entry, from_disk) = match inner.memory.get(key) {
            Some(entry) => (Some(entry.clone()), false),
            None => {
                let from_disk = self.disk.get(key)?;
                if let Some(ref entry) = from_disk {
                    inner.stats.promotions += 1;
                    inner.memory.insert(entry.clone());
                    inner.stats.memory_entries = inner.memory.len();
                }
                (from_disk, true)
            }
        };

        match entry {
            Some(entry) => {
                let is_stale = entry.is_stale();
                if is_stale {
                    inner.stats.stale_serves += 1;
                    warn!(
                        "Serving stale cache entry {} from {} (age {:?})",
                        key,
                        entry.source_tag,
                        entry.age()
                    );
                } else if from_disk {
                    inner.stats.disk_hits += 1;
                } else {
                    inner.stats.memory_hits += 1;
                }
                Ok(Some(StaleEntry {
                    payload: entry.payload.clone(),
                    source_tag: entry.source_tag.clone(),
                    is_stale,
                    age: entry.age(),
                }))
            }
            None => {
                inner.stats.misses += 1;
                Ok(None)
            }
        }
    }

    /// Write an entry to both tiers
    ///
    /// The in-memory write always lands; a failing durable write is
    /// logged at WARN and does not fail the call.
    pub async fn set(
        &self,
        key: CacheKey,
        payload: serde_json::Value,
        ttl: Duration,
        source_tag: impl Into<String>,
    ) -> Result<()> {
        let entry = CacheEntry::new(key, payload, ttl, source_tag);

        let mut inner = self.inner.write().await;
        let evicted = inner.memory.insert(entry.clone());
        inner.stats.evictions_lru += evicted;
        inner.stats.memory_entries = inner.memory.len();

        if let Err(e) = self.disk.put(&entry) {
            warn!("Durable cache write failed for {}: {}", entry.key, e);
        }

        Ok(())
    }

    /// Remove an entry from both tiers; returns whether anything was
    /// removed
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let in_memory = inner.memory.remove(key);
        let on_disk = self.disk.remove(key)?;
        let removed = in_memory || on_disk;

        if removed {
            inner.stats.invalidations += 1;
            inner.stats.memory_entries = inner.memory.len();
            debug!("Invalidated cache entry: {}", key);
        }

        Ok(removed)
    }

    /// Remove every entry produced by a collaborator from both tiers
    ///
    /// Used when a collaborator's credentials or schema change and its
    /// historical entries must not be trusted. Returns the number of
    /// entries removed.
    pub async fn invalidate_source(&self, source_tag: &str) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let in_memory = inner.memory.remove_by_source(source_tag);
        let on_disk = self.disk.remove_by_source(source_tag)?;
        let removed = in_memory.max(on_disk);

        inner.stats.invalidations += removed as u64;
        inner.stats.memory_entries = inner.memory.len();
        info!("Invalidated {} entries from source: {}", removed, source_tag);

        Ok(removed)
    }

    /// Remove entries expired longer than `grace` ago from both tiers
    ///
    /// The grace window preserves stale-while-revalidate reads for
    /// recently expired entries.
    pub async fn purge_expired(&self, grace: Duration) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let in_memory = inner.memory.purge_expired(grace);
        let on_disk = self.disk.purge_expired(grace)?;
        let purged = in_memory.max(on_disk);

        inner.stats.purged += purged as u64;
        inner.stats.memory_entries = inner.memory.len();
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }

        Ok(purged)
    }

    /// Current cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats.clone()
    }

    /// The cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

/// Background task for periodic purging of long-expired entries
pub async fn start_auto_purge(cache: Arc<ResponseCache>) {
    let interval = cache.config.purge_interval;
    let grace = cache.config.stale_grace;

    info!("Starting cache auto-purge task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        match cache.purge_expired(grace).await {
            Ok(purged) => {
                if purged > 0 {
                    debug!("Auto purge removed {} entries", purged);
                }
            }
            Err(e) => {
                warn!("Auto purge failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_cache() -> ResponseCache {
        let config = CacheConfig::builder()
            .max_memory_entries(100)
            .enable_auto_purge(false)
            .build();
        ResponseCache::ephemeral(config).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = test_cache();
        cache
            .set(
                "gdelt:events:aaaaaaaaaaaa".to_string(),
                json!({"events": 5}),
                Duration::from_secs(60),
                "gdelt",
            )
            .await
            .unwrap();

        let entry = cache.get("gdelt:events:aaaaaaaaaaaa").await.unwrap();
        let entry = entry.expect("entry should be present");
        assert_eq!(entry.payload, json!({"events": 5}));
        assert_eq!(entry.source_tag, "gdelt");

        let stats = cache.stats().await;
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test]
    async fn test_miss_is_not_an_error() {
        let cache = test_cache();
        let result = cache.get("never:set:000000000000").await.unwrap();
        assert!(result.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_disk_promotion() {
        // Tier-1 of one entry: the second write evicts the first from
        // memory while it lives on in the durable tier.
        let config = CacheConfig::builder()
            .max_memory_entries(1)
            .enable_auto_purge(false)
            .build();
        let cache = ResponseCache::ephemeral(config).unwrap();
        cache
            .set(
                "k1".to_string(),
                json!(1),
                Duration::from_secs(60),
                "s",
            )
            .await
            .unwrap();
        cache
            .set(
                "k2".to_string(),
                json!(2),
                Duration::from_secs(60),
                "s",
            )
            .await
            .unwrap();

        // k1 was evicted from tier-1 but lives on in tier-2
        let entry = cache.get("k1").await.unwrap();
        assert!(entry.is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.disk_hits, 1);
        assert_eq!(stats.promotions, 1);
    }

    #[tokio::test]
    async fn test_stale_read_from_disk_counts_as_disk_hit() {
        let config = CacheConfig::builder()
            .max_memory_entries(1)
            .enable_auto_purge(false)
            .build();
        let cache = ResponseCache::ephemeral(config).unwrap();
        cache
            .set("k1".to_string(), json!(1), Duration::from_secs(60), "s")
            .await
            .unwrap();
        cache
            .set("k2".to_string(), json!(2), Duration::from_secs(60), "s")
            .await
            .unwrap();

        // k1 is fresh but only on disk; the stale-tolerant read serves
        // it from the durable tier
        let served = cache.get_stale("k1").await.unwrap().unwrap();
        assert!(!served.is_stale);

        let stats = cache.stats().await;
        assert_eq!(stats.disk_hits, 1);
        assert_eq!(stats.memory_hits, 0);
        assert_eq!(stats.promotions, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_absent_from_plain_get() {
        let cache = test_cache();
        cache
            .set(
                "acled:events:cccccccccccc".to_string(),
                json!({"fatalities": 12}),
                Duration::from_secs(0),
                "acled",
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(cache.get("acled:events:cccccccccccc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_while_revalidate() {
        let cache = test_cache();
        cache
            .set(
                "opensky:state:dddddddddddd".to_string(),
                json!({"alt": 11000}),
                Duration::from_secs(0),
                "opensky",
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        // Plain read treats it as absent
        assert!(cache.get("opensky:state:dddddddddddd").await.unwrap().is_none());

        // Stale-tolerant read serves the payload with the flag set
        let stale = cache
            .get_stale("opensky:state:dddddddddddd")
            .await
            .unwrap()
            .expect("stale entry should be served");
        assert!(stale.is_stale);
        assert_eq!(stale.payload, json!({"alt": 11000}));

        let stats = cache.stats().await;
        assert_eq!(stats.stale_serves, 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = test_cache();
        cache
            .set("k".to_string(), json!(1), Duration::from_secs(60), "s")
            .await
            .unwrap();

        assert!(cache.invalidate("k").await.unwrap());
        assert!(!cache.invalidate("k").await.unwrap());
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_source() {
        let cache = test_cache();
        for i in 0..3 {
            cache
                .set(
                    format!("world_bank:indicator:{:012}", i),
                    json!(i),
                    Duration::from_secs(60),
                    "world_bank",
                )
                .await
                .unwrap();
        }
        cache
            .set(
                "gdelt:events:eeeeeeeeeeee".to_string(),
                json!([]),
                Duration::from_secs(60),
                "gdelt",
            )
            .await
            .unwrap();

        let removed = cache.invalidate_source("world_bank").await.unwrap();
        assert_eq!(removed, 3);
        assert!(cache.get("gdelt:events:eeeeeeeeeeee").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_overwrites() {
        let cache = test_cache();
        cache
            .set("k".to_string(), json!("old"), Duration::from_secs(60), "s")
            .await
            .unwrap();
        cache
            .set("k".to_string(), json!("new"), Duration::from_secs(60), "s")
            .await
            .unwrap();

        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.payload, json!("new"));
    }

    #[tokio::test]
    async fn test_purge_expired_removes_past_grace() {
        let cache = test_cache();
        cache
            .set("k".to_string(), json!(1), Duration::from_secs(0), "s")
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let purged = cache.purge_expired(Duration::from_secs(0)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(cache.get_stale("k").await.unwrap().is_none());
    }
}
