//! Concurrent cross-source correlation
//!
//! The correlator fans a query out to every source a routing decision
//! selected, bounds each call by the source's own deadline, and merges
//! whatever comes back into a single [`CorrelationResult`]. One slow or
//! broken source never sinks the batch: its failure is recorded as that
//! source's outcome and the rest proceed.
//!
//! Claims from successful sources are grouped by (subject, predicate)
//! and compared; agreement across two or more sources is surfaced as a
//! corroboration, disagreement as a conflict. Quality tiers weight the
//! significance of either finding but never adjudicate who is right.

pub mod claims;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{ArgusError, Result};
use crate::resolver::EntityResolver;
use crate::router::{QueryFeature, RelevanceDecision};
use crate::source::{Claim, SourceQuery, SourceRegistry, SourceStatus};

use claims::SourcedClaim;
pub use types::{
    Conflict, ConflictValue, CorrelationResult, Corroboration, OutcomeStatus, SourceOutcome,
};

/// Correlator tuning knobs
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    /// Relative tolerance for numeric claim agreement. Two numbers agree
    /// when their difference is within this fraction of the larger
    /// magnitude.
    pub numeric_tolerance: f64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            numeric_tolerance: 0.02,
        }
    }
}

impl CorrelatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.numeric_tolerance) {
            return Err(ArgusError::Config(format!(
                "numeric_tolerance must be in [0, 1), got {}",
                self.numeric_tolerance
            )));
        }
        Ok(())
    }
}

/// Fans queries out to selected sources and merges their results
pub struct Correlator {
    registry: Arc<SourceRegistry>,
    resolver: Option<Arc<EntityResolver>>,
    config: CorrelatorConfig,
}

impl Correlator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            resolver: None,
            config: CorrelatorConfig::default(),
        }
    }

    /// Attach an entity resolver used to align claim subjects and to
    /// annotate entity-shaped queries
    pub fn with_resolver(mut self, resolver: Arc<EntityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_config(mut self, config: CorrelatorConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Query every selected source concurrently and merge the outcomes
    ///
    /// Every tag in the decision appears exactly once in the result's
    /// `per_source` map. A tag with no registered adapter becomes an
    /// `Error` outcome rather than a hard failure. Outcomes are keyed by
    /// tag, so completion order never changes the result.
    pub async fn correlate(
        &self,
        query: &str,
        decision: &RelevanceDecision,
    ) -> CorrelationResult {
        let started = Instant::now();

        let entity = match &self.resolver {
            Some(resolver) if decision.has_feature(QueryFeature::EntityLike) => {
                Some(resolver.resolve(query).await)
            }
            _ => None,
        };

        let request = SourceQuery::new(query);
        let mut per_source: BTreeMap<String, SourceOutcome> = BTreeMap::new();
        let mut claims_by_source: Vec<(String, f64, Vec<Claim>)> = Vec::new();
        let mut join_set = JoinSet::new();

        for tag in &decision.selected_sources {
            let Some(source) = self.registry.get(tag) else {
                warn!(source = %tag, "selected source has no registered adapter");
                per_source.insert(
                    tag.clone(),
                    SourceOutcome::error("no registered adapter for this source"),
                );
                continue;
            };

            let tag = tag.clone();
            let request = request.clone();
            join_set.spawn(async move {
                let deadline = source.timeout();
                let outcome = tokio::time::timeout(deadline, source.query(&request)).await;
                (tag, source.quality().weight(), deadline, outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (tag, weight, deadline, outcome) = match joined {
                Ok(parts) => parts,
                Err(err) => {
                    // The tag is lost with the task, so this cannot be
                    // attributed to a source; adapters returning Result
                    // instead of panicking keeps this path cold.
                    warn!(error = %err, "source task aborted");
                    continue;
                }
            };

            let outcome = match outcome {
                Err(_) => {
                    warn!(source = %tag, timeout_seconds = deadline.as_secs(), "source timed out");
                    SourceOutcome::timeout(format!(
                        "exceeded {}s deadline",
                        deadline.as_secs()
                    ))
                }
                Ok(Err(err)) => {
                    warn!(source = %tag, error = %err, "source query failed");
                    SourceOutcome::error(err.to_string())
                }
                Ok(Ok(response)) => match response.status {
                    SourceStatus::Success => {
                        debug!(source = %tag, claims = response.claims.len(), "source returned data");
                        if !response.claims.is_empty() {
                            claims_by_source.push((tag.clone(), weight, response.claims));
                        }
                        SourceOutcome::ok(response.payload, response.attribution)
                    }
                    SourceStatus::NoData => SourceOutcome::no_data(response.attribution),
                    SourceStatus::RateLimited => {
                        warn!(source = %tag, "source rate limited");
                        SourceOutcome::error("rate limited")
                    }
                    SourceStatus::Error => SourceOutcome::error("source reported an error"),
                },
            };

            per_source.insert(tag, outcome);
        }

        let align = decision.has_feature(QueryFeature::EntityLike);
        let grouped = self.group_claims(claims_by_source, align);
        let (corroborations, conflicts) = claims::analyze(grouped, self.config.numeric_tolerance);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            query = %query,
            sources = per_source.len(),
            corroborations = corroborations.len(),
            conflicts = conflicts.len(),
            elapsed_ms,
            "correlation complete"
        );

        CorrelationResult {
            query: query.to_string(),
            entity,
            per_source,
            corroborations,
            conflicts,
            elapsed_ms,
        }
    }

    /// Group claims by (subject, predicate), aligning subjects to
    /// canonical entity ids where the resolver recognizes them
    ///
    /// Alignment lets "V. Putin" from one source and "Vladimir Putin"
    /// from another land in the same group. It runs only for
    /// entity-shaped queries: a fuzzy rewrite of arbitrary topic
    /// subjects could merge unrelated groups. Only the offline tiers are
    /// consulted so grouping stays synchronous and self-contained.
    fn group_claims(
        &self,
        claims_by_source: Vec<(String, f64, Vec<Claim>)>,
        align: bool,
    ) -> BTreeMap<(String, String), Vec<SourcedClaim>> {
        let mut grouped: BTreeMap<(String, String), Vec<SourcedClaim>> = BTreeMap::new();

        for (source, weight, source_claims) in claims_by_source {
            for claim in source_claims {
                let subject = if align {
                    self.align_subject(&claim.subject)
                } else {
                    claim.subject
                };
                grouped
                    .entry((subject, claim.predicate))
                    .or_default()
                    .push(SourcedClaim {
                        source: source.clone(),
                        weight,
                        value: claim.value,
                    });
            }
        }

        grouped
    }

    fn align_subject(&self, subject: &str) -> String {
        if let Some(resolver) = &self.resolver {
            let matched = resolver.resolve_offline(subject);
            if matched.is_resolved() {
                if let Some(id) = matched.entity_id {
                    return id;
                }
            }
        }
        subject.to_string()
    }
}
