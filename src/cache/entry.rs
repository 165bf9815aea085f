//! Cache entry management with TTL support

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::types::CacheKey;

/// A cached provider response with TTL metadata
///
/// One entry exists per key; a refresh overwrites the previous entry
/// rather than appending. Expired entries are retained (for
/// stale-while-revalidate reads) until explicitly purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// The cached provider response
    pub payload: serde_json::Value,

    /// Which collaborator produced this entry
    pub source_tag: String,

    /// When the entry was created
    pub created_at: DateTime<Utc>,

    /// Time-to-live in seconds
    pub ttl_seconds: u64,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(
        key: CacheKey,
        payload: serde_json::Value,
        ttl: Duration,
        source_tag: impl Into<String>,
    ) -> Self {
        Self {
            key,
            payload,
            source_tag: source_tag.into(),
            created_at: Utc::now(),
            ttl_seconds: ttl.as_secs(),
        }
    }

    /// Reconstruct an entry from stored fields (durable-tier reads)
    pub fn from_parts(
        key: CacheKey,
        payload: serde_json::Value,
        source_tag: String,
        created_at: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            key,
            payload,
            source_tag,
            created_at,
            ttl_seconds,
        }
    }

    /// When the entry expires
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + ChronoDuration::seconds(self.ttl_seconds as i64)
    }

    /// Check if the entry has outlived its TTL
    pub fn is_stale(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the entry expired longer than `grace` ago
    ///
    /// Used by the purge pass: entries within the grace window remain
    /// serviceable through stale reads.
    pub fn is_past_grace(&self, grace: Duration) -> bool {
        let cutoff = self.expires_at()
            + ChronoDuration::from_std(grace).unwrap_or_else(|_| ChronoDuration::seconds(0));
        Utc::now() > cutoff
    }

    /// Time until expiration, if not yet expired
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now();
        let expires_at = self.expires_at();
        if now > expires_at {
            None
        } else {
            (expires_at - now).to_std().ok()
        }
    }

    /// Age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

/// A stale-tolerant read result
///
/// Produced by `ResponseCache::get_stale`: the payload is returned even
/// when expired, with the staleness flagged to the caller.
#[derive(Debug, Clone)]
pub struct StaleEntry {
    /// The cached payload
    pub payload: serde_json::Value,

    /// Which collaborator produced the entry
    pub source_tag: String,

    /// Whether the entry had outlived its TTL at read time
    pub is_stale: bool,

    /// Age of the entry at read time
    pub age: Duration,
}
