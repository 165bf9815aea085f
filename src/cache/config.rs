//! Configuration for the cache system

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// TTL policy classes consumed by source adapters
///
/// The cache itself takes an explicit TTL on every write; these classes
/// are the shared policy table adapters draw their TTLs from, keyed by
/// how fast the underlying data moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Fast-moving transport data (vessel/aircraft positions)
    Transport,
    /// News and event feeds
    News,
    /// Conflict-event datasets
    ConflictEvents,
    /// Economic, sanctions, and statistical data
    Economic,
    /// Slowly-changing reference and knowledge-base data
    Reference,
}

impl TtlClass {
    /// The TTL for this class of data
    pub fn ttl(&self) -> Duration {
        match self {
            TtlClass::Transport => Duration::from_secs(5 * 60),
            TtlClass::News => Duration::from_secs(3600),
            TtlClass::ConflictEvents => Duration::from_secs(12 * 3600),
            TtlClass::Economic => Duration::from_secs(24 * 3600),
            TtlClass::Reference => Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Configuration for the two-tier response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path of the durable-tier SQLite database
    pub db_path: PathBuf,

    /// Maximum number of entries in the in-memory tier
    pub max_memory_entries: usize,

    /// How long expired entries remain serviceable for stale reads
    /// before a purge pass removes them
    pub stale_grace: Duration,

    /// Enable the background purge task
    pub enable_auto_purge: bool,

    /// Interval between purge passes
    pub purge_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("argus-cache.db"),
            // 10,000 entries default
            max_memory_entries: 10_000,
            // Keep stale entries serviceable for a day
            stale_grace: Duration::from_secs(24 * 3600),
            enable_auto_purge: true,
            // Purge every 15 minutes
            purge_interval: Duration::from_secs(900),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_memory_entries == 0 {
            return Err("max_memory_entries must be greater than 0".to_string());
        }

        if self.purge_interval.is_zero() {
            return Err("purge_interval must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    db_path: Option<PathBuf>,
    max_memory_entries: Option<usize>,
    stale_grace: Option<Duration>,
    enable_auto_purge: Option<bool>,
    purge_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Set the durable-tier database path
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Set the maximum number of in-memory entries
    pub fn max_memory_entries(mut self, max: usize) -> Self {
        self.max_memory_entries = Some(max);
        self
    }

    /// Set the stale-read grace window
    pub fn stale_grace(mut self, grace: Duration) -> Self {
        self.stale_grace = Some(grace);
        self
    }

    /// Enable or disable the background purge task
    pub fn enable_auto_purge(mut self, enable: bool) -> Self {
        self.enable_auto_purge = Some(enable);
        self
    }

    /// Set the purge interval
    pub fn purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            db_path: self.db_path.unwrap_or(defaults.db_path),
            max_memory_entries: self
                .max_memory_entries
                .unwrap_or(defaults.max_memory_entries),
            stale_grace: self.stale_grace.unwrap_or(defaults.stale_grace),
            enable_auto_purge: self
                .enable_auto_purge
                .unwrap_or(defaults.enable_auto_purge),
            purge_interval: self.purge_interval.unwrap_or(defaults.purge_interval),
        }
    }
}
