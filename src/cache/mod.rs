//! Two-tier response cache for provider data
//!
//! Caches the results of expensive, rate-limited, or slow remote calls
//! with staleness-aware reuse:
//!
//! - **Tier-1**: in-memory map with LRU eviction, shared across all
//!   concurrent collaborator calls.
//! - **Tier-2**: durable SQLite storage in WAL mode; one shared
//!   connection per process, writes serialized, readers unblocked.
//!
//! Reads consult tier-1 first and promote tier-2 hits. Expired entries
//! are absent to plain reads but remain serviceable through
//! [`ResponseCache::get_stale`] until a purge pass removes them.

pub mod config;
pub mod disk;
pub mod entry;
pub mod key;
pub mod memory;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, TtlClass};
pub use entry::{CacheEntry, StaleEntry};
pub use key::CacheKeyBuilder;
pub use store::{start_auto_purge, ResponseCache};
pub use types::{CacheKey, CacheStats};
