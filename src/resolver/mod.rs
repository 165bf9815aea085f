//! Tiered entity resolution
//!
//! Matches a free-text name or identifier to a canonical entity identity
//! through an ordered cascade of strategies. Each tier is attempted only
//! if the previous one failed, and the first success terminates the
//! cascade — a later, weaker match never overrides an earlier, stronger
//! one:
//!
//! 1. **Exact** — case-sensitive registry match (confidence 1.0)
//! 2. **Normalized** — lowercased, whitespace-collapsed, diacritics
//!    stripped (0.95)
//! 3. **External lookup** — optional knowledge-base collaborator (0.85)
//! 4. **Fuzzy** — edit-distance ratio against every registry label,
//!    thresholded (0.7–0.9, scaled by similarity)
//! 5. **Failed** — confidence 0.0 with near-miss suggestions
//!
//! All confidences are configurable defaults, not calibrated
//! probabilities.

pub mod normalize;
pub mod registry;
pub mod similarity;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use normalize::normalize;
use similarity::similarity;

pub use registry::{EntityRecord, EntityRegistry};

/// Which cascade tier produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Normalized,
    ExternalLookup,
    Fuzzy,
    Failed,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::Exact => write!(f, "exact"),
            MatchTier::Normalized => write!(f, "normalized"),
            MatchTier::ExternalLookup => write!(f, "external_lookup"),
            MatchTier::Fuzzy => write!(f, "fuzzy"),
            MatchTier::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of resolving a text query to an identity
///
/// Invariant: `tier == Failed` exactly when `confidence == 0.0` exactly
/// when `entity_id.is_none()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMatch {
    /// Canonical entity identity, if resolved
    pub entity_id: Option<String>,

    /// External knowledge-base identifier, if the external tier matched
    pub external_id: Option<String>,

    /// Which tier produced this result
    pub tier: MatchTier,

    /// Confidence in [0, 1]; 0.0 exactly for failed resolutions
    pub confidence: f64,

    /// The query as originally submitted
    pub original_query: String,

    /// The label that matched, if any
    pub matched_label: Option<String>,

    /// Near-miss suggestions (populated only on failure)
    pub suggestions: Vec<String>,
}

impl EntityMatch {
    pub fn is_resolved(&self) -> bool {
        self.tier != MatchTier::Failed
    }
}

/// Top-ranked candidate returned by an external knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeCandidate {
    /// Knowledge-base identifier
    pub id: String,

    /// Candidate label
    pub label: String,
}

/// External knowledge-base collaborator consumed by the resolver
///
/// Out-of-scope adapters implement this; the resolver only consumes the
/// top-ranked candidate. A missing collaborator is not an error — the
/// cascade simply skips to fuzzy matching.
#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    /// Return the top-ranked candidate for a normalized query, if any
    async fn lookup(&self, query: &str) -> Result<Option<KnowledgeCandidate>>;
}

/// Configuration for the resolution cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Confidence assigned to exact registry matches
    pub exact_confidence: f64,

    /// Confidence assigned to normalized registry matches
    pub normalized_confidence: f64,

    /// Confidence assigned to external-lookup matches; lower than the
    /// local tiers because it rides on a third party's ranking
    pub external_confidence: f64,

    /// Minimum similarity for a fuzzy match to win
    pub fuzzy_threshold: f64,

    /// Confidence band fuzzy matches are scaled into, by similarity
    pub fuzzy_band: (f64, f64),

    /// Minimum similarity for a near-miss to appear as a suggestion
    pub suggestion_floor: f64,

    /// Maximum number of suggestions on failure
    pub max_suggestions: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            exact_confidence: 1.0,
            normalized_confidence: 0.95,
            external_confidence: 0.85,
            fuzzy_threshold: 0.8,
            fuzzy_band: (0.7, 0.9),
            suggestion_floor: 0.5,
            max_suggestions: 3,
        }
    }
}

impl ResolverConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, v) in [
            ("exact_confidence", self.exact_confidence),
            ("normalized_confidence", self.normalized_confidence),
            ("external_confidence", self.external_confidence),
            ("fuzzy_threshold", self.fuzzy_threshold),
            ("suggestion_floor", self.suggestion_floor),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{} must be between 0.0 and 1.0", name));
            }
        }

        if self.fuzzy_band.0 > self.fuzzy_band.1 {
            return Err("fuzzy_band must be (low, high) with low <= high".to_string());
        }

        if self.suggestion_floor >= self.fuzzy_threshold {
            return Err("suggestion_floor must be below fuzzy_threshold".to_string());
        }

        Ok(())
    }
}

/// Entity resolver with an ordered matching cascade
pub struct EntityResolver {
    registry: EntityRegistry,
    lookup: Option<Arc<dyn KnowledgeLookup>>,
    config: ResolverConfig,
}

impl EntityResolver {
    pub fn new(registry: EntityRegistry) -> Self {
        Self {
            registry,
            lookup: None,
            config: ResolverConfig::default(),
        }
    }

    /// Attach an external knowledge-base collaborator
    pub fn with_lookup(mut self, lookup: Arc<dyn KnowledgeLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Set configuration
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// The curated registry
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Resolve a free-text query through the full cascade
    pub async fn resolve(&self, query: &str) -> EntityMatch {
        if let Some(matched) = self.try_exact(query) {
            return self.log_and_return(matched);
        }

        let normalized = normalize(query);

        if let Some(matched) = self.try_normalized(query, &normalized) {
            return self.log_and_return(matched);
        }

        if let Some(matched) = self.try_external(query, &normalized).await {
            return self.log_and_return(matched);
        }

        if let Some(matched) = self.try_fuzzy(query, &normalized) {
            return self.log_and_return(matched);
        }

        self.log_and_return(self.build_failed(query, &normalized))
    }

    /// Resolve without the external tier
    ///
    /// Pure and synchronous; used by the correlator to align per-source
    /// entity labels without suspending.
    pub fn resolve_offline(&self, query: &str) -> EntityMatch {
        if let Some(matched) = self.try_exact(query) {
            return self.log_and_return(matched);
        }

        let normalized = normalize(query);

        if let Some(matched) = self.try_normalized(query, &normalized) {
            return self.log_and_return(matched);
        }

        if let Some(matched) = self.try_fuzzy(query, &normalized) {
            return self.log_and_return(matched);
        }

        self.log_and_return(self.build_failed(query, &normalized))
    }

    fn try_exact(&self, query: &str) -> Option<EntityMatch> {
        self.registry.find_exact(query).map(|record| EntityMatch {
            entity_id: Some(record.id.clone()),
            external_id: None,
            tier: MatchTier::Exact,
            confidence: self.config.exact_confidence,
            original_query: query.to_string(),
            matched_label: Some(record.label.clone()),
            suggestions: Vec::new(),
        })
    }

    fn try_normalized(&self, query: &str, normalized: &str) -> Option<EntityMatch> {
        self.registry
            .find_normalized(normalized)
            .map(|record| EntityMatch {
                entity_id: Some(record.id.clone()),
                external_id: None,
                tier: MatchTier::Normalized,
                confidence: self.config.normalized_confidence,
                original_query: query.to_string(),
                matched_label: Some(record.label.clone()),
                suggestions: Vec::new(),
            })
    }

    async fn try_external(&self, query: &str, normalized: &str) -> Option<EntityMatch> {
        let lookup = self.lookup.as_ref()?;

        match lookup.lookup(normalized).await {
            Ok(Some(candidate)) => Some(EntityMatch {
                entity_id: Some(candidate.id.clone()),
                external_id: Some(candidate.id),
                tier: MatchTier::ExternalLookup,
                confidence: self.config.external_confidence,
                original_query: query.to_string(),
                matched_label: Some(candidate.label),
                suggestions: Vec::new(),
            }),
            Ok(None) => None,
            Err(e) => {
                // Unreachable lookup is a tier miss, not a resolution error
                warn!("External lookup failed for '{}': {}", query, e);
                None
            }
        }
    }

    fn try_fuzzy(&self, query: &str, normalized: &str) -> Option<EntityMatch> {
        let best = self
            .registry
            .iter()
            .map(|record| (record, similarity(normalized, &normalize(&record.label))))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

        let (record, score) = best;
        if score < self.config.fuzzy_threshold {
            return None;
        }

        // Scale similarity linearly into the configured confidence band
        let (low, high) = self.config.fuzzy_band;
        let span = 1.0 - self.config.fuzzy_threshold;
        let position = if span > 0.0 {
            (score - self.config.fuzzy_threshold) / span
        } else {
            1.0
        };
        let confidence = low + position * (high - low);

        Some(EntityMatch {
            entity_id: Some(record.id.clone()),
            external_id: None,
            tier: MatchTier::Fuzzy,
            confidence,
            original_query: query.to_string(),
            matched_label: Some(record.label.clone()),
            suggestions: Vec::new(),
        })
    }

    fn build_failed(&self, query: &str, normalized: &str) -> EntityMatch {
        let mut near_misses: Vec<(String, f64)> = self
            .registry
            .iter()
            .map(|record| {
                (
                    record.label.clone(),
                    similarity(normalized, &normalize(&record.label)),
                )
            })
            .filter(|(_, score)| {
                *score >= self.config.suggestion_floor && *score < self.config.fuzzy_threshold
            })
            .collect();

        near_misses.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        near_misses.truncate(self.config.max_suggestions);

        let suggestions = if near_misses.is_empty() {
            vec!["No close matches; try a full canonical name or a known identifier".to_string()]
        } else {
            near_misses.into_iter().map(|(label, _)| label).collect()
        };

        EntityMatch {
            entity_id: None,
            external_id: None,
            tier: MatchTier::Failed,
            confidence: 0.0,
            original_query: query.to_string(),
            matched_label: None,
            suggestions,
        }
    }

    fn log_and_return(&self, matched: EntityMatch) -> EntityMatch {
        if matched.is_resolved() {
            info!(
                "Resolved '{}' via {} tier (confidence {:.2})",
                matched.original_query, matched.tier, matched.confidence
            );
        } else {
            debug!("Resolution failed for '{}'", matched.original_query);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> EntityResolver {
        EntityResolver::new(EntityRegistry::with_defaults())
    }

    struct FixedLookup {
        candidate: Option<KnowledgeCandidate>,
    }

    #[async_trait]
    impl KnowledgeLookup for FixedLookup {
        async fn lookup(&self, _query: &str) -> Result<Option<KnowledgeCandidate>> {
            Ok(self.candidate.clone())
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl KnowledgeLookup for FailingLookup {
        async fn lookup(&self, _query: &str) -> Result<Option<KnowledgeCandidate>> {
            Err(crate::error::ArgusError::Lookup("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_exact_match() {
        let result = resolver().resolve("Vladimir Putin").await;
        assert_eq!(result.tier, MatchTier::Exact);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.entity_id.as_deref(), Some("Q7747"));
    }

    #[tokio::test]
    async fn test_normalized_match() {
        let result = resolver().resolve("VLADIMIR   putin").await;
        assert_eq!(result.tier, MatchTier::Normalized);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.entity_id.as_deref(), Some("Q7747"));
    }

    #[tokio::test]
    async fn test_exact_beats_fuzzy() {
        // "NATO" would also fuzzy-match; exact must win and halt the cascade
        let result = resolver().resolve("NATO").await;
        assert_eq!(result.tier, MatchTier::Exact);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_external_lookup_tier() {
        let lookup = Arc::new(FixedLookup {
            candidate: Some(KnowledgeCandidate {
                id: "Q212".to_string(),
                label: "Ukraine".to_string(),
            }),
        });
        let resolver = resolver().with_lookup(lookup);

        let result = resolver.resolve("Ukrainian state").await;
        assert_eq!(result.tier, MatchTier::ExternalLookup);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.entity_id.as_deref(), Some("Q212"));
        assert_eq!(result.external_id.as_deref(), Some("Q212"));
    }

    #[tokio::test]
    async fn test_failing_lookup_falls_through_to_fuzzy() {
        let resolver = resolver().with_lookup(Arc::new(FailingLookup));

        // One typo off a registry label: fuzzy should still catch it
        let result = resolver.resolve("Vladimir Putjn").await;
        assert_eq!(result.tier, MatchTier::Fuzzy);
        assert!(result.confidence >= 0.7 && result.confidence <= 0.9);
        assert_eq!(result.entity_id.as_deref(), Some("Q7747"));
    }

    #[tokio::test]
    async fn test_fuzzy_confidence_band() {
        let result = resolver().resolve("Vladimir Putim").await;
        assert_eq!(result.tier, MatchTier::Fuzzy);
        // 1 edit over 14 characters: similarity ~0.93, inside the band
        assert!(result.confidence > 0.7);
        assert!(result.confidence < 0.9);
    }

    #[tokio::test]
    async fn test_failed_resolution_invariant() {
        let result = resolver().resolve("xyznonexistententity123").await;
        assert_eq!(result.tier, MatchTier::Failed);
        assert_eq!(result.confidence, 0.0);
        assert!(result.entity_id.is_none());
        assert!(!result.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_failed_resolution_near_miss_suggestions() {
        // Close-ish to "Angela Merkel" but under the 0.8 threshold
        let result = resolver().resolve("Angela Mk").await;
        if result.tier == MatchTier::Failed {
            assert!(result
                .suggestions
                .iter()
                .any(|s| s == "Angela Merkel" || s.contains("No close matches")));
        }
    }

    #[tokio::test]
    async fn test_resolution_idempotence() {
        let resolver = resolver();
        let a = resolver.resolve("Xi Jinping").await;
        let b = resolver.resolve("Xi Jinping").await;

        assert_eq!(a.tier, b.tier);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.entity_id, b.entity_id);
        assert_eq!(a.matched_label, b.matched_label);
    }

    #[test]
    fn test_resolve_offline_skips_external() {
        let result = resolver().resolve_offline("Gazprom");
        assert_eq!(result.tier, MatchTier::Exact);

        let result = resolver().resolve_offline("gazprom");
        assert_eq!(result.tier, MatchTier::Normalized);
    }

    #[test]
    fn test_config_validation() {
        assert!(ResolverConfig::default().validate().is_ok());

        let mut bad = ResolverConfig::default();
        bad.fuzzy_threshold = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = ResolverConfig::default();
        bad.suggestion_floor = 0.9;
        assert!(bad.validate().is_err());
    }
}
