//! Collaborator interface for external data providers
//!
//! Every remote data source (news feeds, economic statistics, entity
//! knowledge bases, transport trackers, sanctions registries) is wrapped
//! by an adapter implementing [`Source`]. The correlator consumes sources
//! exclusively through this trait; adapters are registered in a closed
//! [`SourceRegistry`] lookup table.
//!
//! Expected operational outcomes (rate limiting, no data) are returned as
//! [`SourceStatus`] values. Only genuinely unexpected conditions (timeout,
//! malformed response, auth failure) surface as errors.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Static trust level of a source, independent of any single query's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Authoritative or primary-source data
    High,
    /// Reputable aggregated data
    Medium,
    /// Crowd-sourced or loosely verified data
    Low,
}

impl QualityTier {
    /// Weight used when scoring corroboration/conflict significance
    pub fn weight(&self) -> f64 {
        match self {
            QualityTier::High => 1.0,
            QualityTier::Medium => 0.6,
            QualityTier::Low => 0.3,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::High => write!(f, "high"),
            QualityTier::Medium => write!(f, "medium"),
            QualityTier::Low => write!(f, "low"),
        }
    }
}

/// Outcome status reported by a collaborator call
///
/// `NoData` and `RateLimited` are expected states and must never be
/// raised as errors by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source returned usable data
    Success,
    /// The source completed but holds no data for this query
    NoData,
    /// The source refused the call due to rate limiting
    RateLimited,
    /// The source reported a soft failure in-band
    Error,
}

/// Source-attribution metadata carried with every response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    /// URL the data was retrieved from, if applicable
    pub url: Option<String>,

    /// When the data was retrieved
    pub retrieved_at: DateTime<Utc>,
}

impl Attribution {
    /// Attribution for a response retrieved just now
    pub fn now(url: Option<String>) -> Self {
        Self {
            url,
            retrieved_at: Utc::now(),
        }
    }
}

/// A typed value asserted by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimValue::Number(n) => write!(f, "{}", n),
            ClaimValue::Bool(b) => write!(f, "{}", b),
            ClaimValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A comparable fact extracted from a source response
///
/// Claims are the unit of cross-source comparison: two sources asserting
/// the same `(subject, predicate)` pair either corroborate or conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Entity or topic the claim is about (label or canonical id)
    pub subject: String,

    /// What is being asserted (e.g. "gdp_usd", "sanctioned")
    pub predicate: String,

    /// The asserted value
    pub value: ClaimValue,
}

impl Claim {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        value: ClaimValue,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            value,
        }
    }
}

/// Parameters for a collaborator call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceQuery {
    /// Free-text query as issued by the caller
    pub text: String,

    /// Source-specific parameters (sorted map keeps cache keys stable)
    pub params: BTreeMap<String, String>,
}

impl SourceQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Result of a collaborator call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponse {
    /// Outcome status
    pub status: SourceStatus,

    /// Opaque structured payload (adapter-specific shape)
    pub payload: serde_json::Value,

    /// Comparable claims extracted by the adapter
    pub claims: Vec<Claim>,

    /// Attribution metadata
    pub attribution: Attribution,
}

impl SourceResponse {
    /// A successful response with payload and claims
    pub fn success(payload: serde_json::Value, claims: Vec<Claim>) -> Self {
        Self {
            status: SourceStatus::Success,
            payload,
            claims,
            attribution: Attribution::now(None),
        }
    }

    /// A completed call that found no data (expected, non-exceptional)
    pub fn no_data() -> Self {
        Self {
            status: SourceStatus::NoData,
            payload: serde_json::Value::Null,
            claims: Vec::new(),
            attribution: Attribution::now(None),
        }
    }

    /// A rate-limited response (expected, non-exceptional)
    pub fn rate_limited() -> Self {
        Self {
            status: SourceStatus::RateLimited,
            payload: serde_json::Value::Null,
            claims: Vec::new(),
            attribution: Attribution::now(None),
        }
    }

    /// Set attribution metadata
    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }
}

/// An external data provider reachable over a network call
///
/// Adapters internally consult the response cache before making remote
/// calls; that is their concern, not the correlator's.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable identifier, used as the source tag in cache entries and
    /// correlation results
    fn name(&self) -> &str;

    /// Static trust level of this source
    fn quality(&self) -> QualityTier;

    /// Per-source deadline for a single query. A slow transport tracker
    /// must not delay a fast news query, so there is no global timeout.
    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Execute a query against the source
    async fn query(&self, request: &SourceQuery) -> Result<SourceResponse>;

    /// Check whether the source is reachable and responsive
    async fn health_check(&self) -> bool {
        true
    }
}

/// Closed lookup table of registered source adapters
///
/// No reflection-based discovery: every adapter is registered explicitly
/// at construction time and addressed by its stable name.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source adapter under its own name
    pub fn register(&mut self, source: Arc<dyn Source>) {
        let name = source.name().to_string();
        debug!("Registering source adapter: {}", name);
        if self.sources.insert(name.clone(), source).is_some() {
            warn!("Replaced previously registered source adapter: {}", name);
        }
    }

    /// Look up a source by its tag
    pub fn get(&self, name: &str) -> Option<Arc<dyn Source>> {
        self.sources.get(name).cloned()
    }

    /// Names of all registered sources, sorted for determinism
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run health checks against every registered source
    ///
    /// Returns a map of source tag to health outcome. A failing check is
    /// reported, never raised.
    pub async fn health_check_all(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        for (name, source) in &self.sources {
            let healthy = source.health_check().await;
            if !healthy {
                warn!("Source failed health check: {}", name);
            }
            results.insert(name.clone(), healthy);
        }
        results
    }
}
