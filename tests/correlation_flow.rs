//! Routing and correlation working together end to end

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use argus::resolver::{EntityRegistry, EntityResolver};
use argus::router::{FocusArea, QueryFeature, SourceRelevanceRouter};
use argus::source::{
    Claim, ClaimValue, QualityTier, Source, SourceQuery, SourceRegistry, SourceResponse,
};
use argus::{Correlator, OutcomeStatus, Result};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct MockSource {
    name: &'static str,
    quality: QualityTier,
    delay: Duration,
    claims: Vec<Claim>,
}

impl MockSource {
    fn new(name: &'static str, quality: QualityTier, claims: Vec<Claim>) -> Self {
        Self {
            name,
            quality,
            delay: Duration::ZERO,
            claims,
        }
    }

    fn hanging(name: &'static str) -> Self {
        Self {
            name,
            quality: QualityTier::Low,
            delay: Duration::from_secs(60),
            claims: Vec::new(),
        }
    }
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    fn quality(&self) -> QualityTier {
        self.quality
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(250)
    }

    async fn query(&self, _request: &SourceQuery) -> Result<SourceResponse> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(SourceResponse::success(
            json!({"source": self.name}),
            self.claims.clone(),
        ))
    }
}

#[tokio::test]
async fn test_country_query_routed_and_correlated() {
    init_tracing();
    let router = SourceRelevanceRouter::default();
    let decision = router.route("Ethiopia conflict trends", Some(FocusArea::Conflict));
    assert!(decision.has_feature(QueryFeature::CountryLike));
    assert_eq!(decision.selected_sources[0], "acled");

    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(MockSource::new(
        "acled",
        QualityTier::High,
        vec![Claim::new("Ethiopia", "fatalities", ClaimValue::Number(210.0))],
    )));
    registry.register(Arc::new(MockSource::new(
        "gdelt",
        QualityTier::Medium,
        vec![Claim::new("Ethiopia", "fatalities", ClaimValue::Number(212.0))],
    )));
    registry.register(Arc::new(MockSource::new(
        "world_bank",
        QualityTier::High,
        Vec::new(),
    )));

    let correlator = Correlator::new(Arc::new(registry));
    let result = correlator
        .correlate("Ethiopia conflict trends", &decision)
        .await;

    // Every routed source is accounted for
    assert_eq!(result.per_source.len(), decision.selected_sources.len());
    assert_eq!(result.per_source["acled"].status, OutcomeStatus::Ok);

    // 210 vs 212 is within the 2% default tolerance
    assert_eq!(result.corroborations.len(), 1);
    assert_eq!(result.corroborations[0].predicate, "fatalities");
    assert!(result.conflicts.is_empty());
}

#[tokio::test]
async fn test_entity_query_carries_resolution() {
    init_tracing();
    let router = SourceRelevanceRouter::default();
    let decision = router.route("Vladimir Putin", None);
    assert!(decision.has_feature(QueryFeature::EntityLike));

    let mut registry = SourceRegistry::new();
    for tag in ["wikidata", "opensanctions", "gdelt"] {
        registry.register(Arc::new(MockSource::new(tag, QualityTier::High, Vec::new())));
    }

    let resolver = Arc::new(EntityResolver::new(EntityRegistry::with_defaults()));
    let correlator = Correlator::new(Arc::new(registry)).with_resolver(resolver);

    let result = correlator.correlate("Vladimir Putin", &decision).await;
    let entity = result.entity.expect("entity-shaped query resolved");
    assert!(entity.is_resolved());
    assert_eq!(entity.entity_id.as_deref(), Some("Q7747"));
}

#[tokio::test]
async fn test_one_hanging_source_does_not_block_the_rest() {
    init_tracing();
    let router = SourceRelevanceRouter::default();
    let decision = router.route("Ethiopia", None);

    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(MockSource::new(
        "world_bank",
        QualityTier::High,
        Vec::new(),
    )));
    registry.register(Arc::new(MockSource::hanging("acled")));
    registry.register(Arc::new(MockSource::new(
        "gdelt",
        QualityTier::Medium,
        Vec::new(),
    )));

    let correlator = Correlator::new(Arc::new(registry));
    let started = Instant::now();
    let result = correlator.correlate("Ethiopia", &decision).await;

    // Bounded by the hanging source's deadline, not its sleep
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(result.per_source["acled"].status, OutcomeStatus::Timeout);
    assert_eq!(result.per_source["world_bank"].status, OutcomeStatus::Ok);
    assert_eq!(result.per_source["gdelt"].status, OutcomeStatus::Ok);
    assert_eq!(result.failed_sources(), vec!["acled"]);
}
