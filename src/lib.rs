//! # Argus
//!
//! Aggregation and caching core for multi-source intelligence queries.
//!
//! ## Features
//!
//! - Two-tier response cache (in-memory + SQLite) with per-class TTLs
//! - Stale-while-revalidate reads for degraded operation
//! - Tiered entity resolution (exact, normalized, external, fuzzy)
//! - Pure source-relevance routing from query shape and focus
//! - Concurrent cross-source correlation with per-source deadlines
//! - Corroboration and conflict surfacing across sources
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use argus::cache::{CacheConfig, ResponseCache};
//! use argus::correlator::Correlator;
//! use argus::resolver::{EntityRegistry, EntityResolver};
//! use argus::router::SourceRelevanceRouter;
//! use argus::source::SourceRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = ResponseCache::open(CacheConfig::default())?;
//!
//!     let router = SourceRelevanceRouter::default();
//!     let decision = router.route("Ethiopia conflict fatalities", None);
//!
//!     let registry = Arc::new(SourceRegistry::new());
//!     let resolver = Arc::new(EntityResolver::new(EntityRegistry::with_defaults()));
//!     let correlator = Correlator::new(registry).with_resolver(resolver);
//!
//!     let result = correlator
//!         .correlate("Ethiopia conflict fatalities", &decision)
//!         .await;
//!     println!("{} sources queried", result.per_source.len());
//!     drop(cache);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate is organized as independent layers a host application wires
//! together: the [`router`] decides which sources matter for a query,
//! the [`correlator`] fans the query out and merges what comes back, the
//! [`resolver`] aligns entity names across sources, and the [`cache`]
//! keeps responses between runs. No layer performs network I/O itself;
//! source adapters implement the [`source::Source`] trait.

pub mod cache;
pub mod correlator;
pub mod error;
pub mod resolver;
pub mod router;
pub mod source;

pub use cache::{CacheConfig, CacheEntry, CacheKeyBuilder, ResponseCache, StaleEntry, TtlClass};
pub use correlator::{
    Conflict, CorrelationResult, Correlator, CorrelatorConfig, Corroboration, OutcomeStatus,
    SourceOutcome,
};
pub use error::{ArgusError, Result};
pub use resolver::{EntityMatch, EntityRegistry, EntityResolver, MatchTier, ResolverConfig};
pub use router::{FocusArea, QueryFeature, RelevanceDecision, RouterConfig, SourceRelevanceRouter};
pub use source::{
    Attribution, Claim, ClaimValue, QualityTier, Source, SourceQuery, SourceRegistry,
    SourceResponse, SourceStatus,
};
