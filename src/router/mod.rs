//! Source-relevance routing
//!
//! Pure, synchronous decision function mapping a query's shape to the
//! ordered set of collaborators worth querying. No network state is
//! consulted, which keeps routing deterministically unit-testable.
//!
//! Heuristics are deliberately lightweight: token and pattern matching,
//! no natural-language understanding.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Detected shape tags for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFeature {
    /// Mentions a known country or region
    CountryLike,
    /// Person- or organization-shaped tokens
    EntityLike,
    /// Vessel identifier pattern (IMO number, MMSI)
    VesselLike,
    /// Aircraft identifier pattern (ICAO24 hex, tail number, flight)
    AircraftLike,
    /// No stronger shape detected; treat as a news/event topic
    TopicLike,
}

impl fmt::Display for QueryFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFeature::CountryLike => write!(f, "country"),
            QueryFeature::EntityLike => write!(f, "entity"),
            QueryFeature::VesselLike => write!(f, "vessel"),
            QueryFeature::AircraftLike => write!(f, "aircraft"),
            QueryFeature::TopicLike => write!(f, "topic"),
        }
    }
}

/// Explicit caller focus, overriding heuristic ranking
///
/// A focus moves the matching source group to the front of the decision
/// but does not exclude other sources, preserving the correlator's
/// cross-validation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Economic,
    Conflict,
    Entity,
    Sanctions,
    Transport,
    News,
}

impl FocusArea {
    /// Parse a focus keyword; unknown keywords are no focus at all
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "economic" | "economy" => Some(FocusArea::Economic),
            "conflict" => Some(FocusArea::Conflict),
            "entity" => Some(FocusArea::Entity),
            "sanctions" => Some(FocusArea::Sanctions),
            "transport" => Some(FocusArea::Transport),
            "news" => Some(FocusArea::News),
            _ => None,
        }
    }
}

/// Output of routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceDecision {
    /// Source tags in priority order; never empty
    pub selected_sources: Vec<String>,

    /// Shape tags detected in the query
    pub features: Vec<QueryFeature>,
}

impl RelevanceDecision {
    pub fn has_feature(&self, feature: QueryFeature) -> bool {
        self.features.contains(&feature)
    }
}

/// Feature-to-source-group mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub economic_sources: Vec<String>,
    pub conflict_sources: Vec<String>,
    pub entity_sources: Vec<String>,
    pub sanctions_sources: Vec<String>,
    pub transport_sources: Vec<String>,
    pub news_sources: Vec<String>,

    /// Broadest-coverage source returned when nothing else matches;
    /// an empty decision would deny the caller any information
    pub fallback_source: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            economic_sources: vec!["world_bank".to_string()],
            conflict_sources: vec!["acled".to_string()],
            entity_sources: vec!["wikidata".to_string()],
            sanctions_sources: vec!["opensanctions".to_string()],
            transport_sources: vec!["ais_stream".to_string(), "opensky".to_string()],
            news_sources: vec!["gdelt".to_string()],
            fallback_source: "gdelt".to_string(),
        }
    }
}

/// Pure relevance router
pub struct SourceRelevanceRouter {
    config: RouterConfig,
}

// Vessel identifiers: IMO numbers (7 digits) and MMSI (9 digits)
static IMO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bIMO\s?\d{7}\b").expect("valid regex"));
static MMSI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bMMSI\s?\d{9}\b").expect("valid regex"));

// Aircraft identifiers: ICAO24 hex, US tail numbers, flight designators
static ICAO24_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{6}$").expect("valid regex"));
static TAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^N\d{1,5}[A-Z]{0,2}$").expect("valid regex"));
static FLIGHT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}\d{1,4}$").expect("valid regex"));

/// Countries and regions recognized by the country heuristic
static COUNTRIES: &[&str] = &[
    "afghanistan", "algeria", "angola", "argentina", "armenia", "australia",
    "azerbaijan", "bangladesh", "belarus", "brazil", "burkina faso", "cameroon",
    "canada", "chad", "chile", "china", "colombia", "cuba", "democratic republic of the congo",
    "egypt", "eritrea", "ethiopia", "france", "georgia", "germany", "ghana", "greece",
    "haiti", "india", "indonesia", "iran", "iraq", "israel", "italy", "japan",
    "kazakhstan", "kenya", "lebanon", "libya", "mali", "mexico", "moldova",
    "morocco", "mozambique", "myanmar", "niger", "nigeria", "north korea",
    "pakistan", "philippines", "poland", "russia", "rwanda", "saudi arabia",
    "senegal", "somalia", "south africa", "south korea", "south sudan", "spain",
    "sudan", "syria", "taiwan", "tanzania", "thailand", "tunisia", "turkey",
    "uganda", "ukraine", "united kingdom", "united states", "venezuela",
    "vietnam", "yemen", "zimbabwe", "sahel", "balkans", "caucasus", "horn of africa",
];

impl SourceRelevanceRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Route a query to an ordered set of sources
    pub fn route(&self, query: &str, explicit_focus: Option<FocusArea>) -> RelevanceDecision {
        let features = detect_features(query);

        // Assemble groups in heuristic priority order
        let mut groups: Vec<(FocusArea, &[String])> = Vec::new();

        if features.contains(&QueryFeature::CountryLike) {
            groups.push((FocusArea::Economic, &self.config.economic_sources));
            groups.push((FocusArea::Conflict, &self.config.conflict_sources));
        }
        if features.contains(&QueryFeature::EntityLike) {
            groups.push((FocusArea::Entity, &self.config.entity_sources));
            groups.push((FocusArea::Sanctions, &self.config.sanctions_sources));
        }
        if features.contains(&QueryFeature::VesselLike)
            || features.contains(&QueryFeature::AircraftLike)
        {
            groups.push((FocusArea::Transport, &self.config.transport_sources));
        }
        // News provides broad coverage regardless of shape
        groups.push((FocusArea::News, &self.config.news_sources));

        // An explicit focus reorders; it never excludes
        if let Some(focus) = explicit_focus {
            if let Some(pos) = groups.iter().position(|(area, _)| *area == focus) {
                let promoted = groups.remove(pos);
                groups.insert(0, promoted);
            } else {
                groups.insert(0, (focus, self.group_for(focus)));
            }
        }

        let mut selected: Vec<String> = Vec::new();
        for (_, sources) in groups {
            for source in sources {
                if !selected.contains(source) {
                    selected.push(source.clone());
                }
            }
        }

        if selected.is_empty() {
            selected.push(self.config.fallback_source.clone());
        }

        debug!(
            "Routed query '{}' to {:?} (features: {:?})",
            query, selected, features
        );

        RelevanceDecision {
            selected_sources: selected,
            features,
        }
    }

    fn group_for(&self, focus: FocusArea) -> &[String] {
        match focus {
            FocusArea::Economic => &self.config.economic_sources,
            FocusArea::Conflict => &self.config.conflict_sources,
            FocusArea::Entity => &self.config.entity_sources,
            FocusArea::Sanctions => &self.config.sanctions_sources,
            FocusArea::Transport => &self.config.transport_sources,
            FocusArea::News => &self.config.news_sources,
        }
    }
}

impl Default for SourceRelevanceRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

/// Detect shape tags via lightweight heuristics
fn detect_features(query: &str) -> Vec<QueryFeature> {
    let mut features = Vec::new();
    let lowered = query.to_lowercase();

    if COUNTRIES.iter().any(|c| contains_phrase(&lowered, c)) {
        features.push(QueryFeature::CountryLike);
    }

    if IMO_PATTERN.is_match(query) || MMSI_PATTERN.is_match(query) {
        features.push(QueryFeature::VesselLike);
    }

    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.iter().any(|t| {
        ICAO24_PATTERN.is_match(t) && t.chars().any(|c| c.is_ascii_digit())
            || TAIL_PATTERN.is_match(t)
            || FLIGHT_PATTERN.is_match(t)
    }) {
        features.push(QueryFeature::AircraftLike);
    }

    if has_name_shaped_tokens(&tokens, &lowered) {
        features.push(QueryFeature::EntityLike);
    }

    if features.is_empty() {
        features.push(QueryFeature::TopicLike);
    }

    features
}

/// Word-boundary phrase containment
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    match haystack.find(phrase) {
        Some(pos) => {
            let before_ok = pos == 0
                || !haystack[..pos]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_alphanumeric());
            let end = pos + phrase.len();
            let after_ok = end == haystack.len()
                || !haystack[end..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphanumeric());
            before_ok && after_ok
        }
        None => false,
    }
}

/// Person/organization-shaped tokens: capitalized words or acronyms that
/// are not recognized country names
fn has_name_shaped_tokens(tokens: &[&str], lowered: &str) -> bool {
    tokens.iter().any(|t| {
        let trimmed = t.trim_matches(|c: char| !c.is_alphanumeric());
        if trimmed.len() < 2 {
            return false;
        }
        let is_capitalized = trimmed
            .chars()
            .next()
            .is_some_and(|c| c.is_uppercase())
            && trimmed.chars().skip(1).any(|c| c.is_lowercase());
        let is_acronym = trimmed.len() >= 2
            && trimmed.chars().all(|c| c.is_ascii_uppercase());
        let in_country_list = COUNTRIES
            .iter()
            .any(|c| c.split(' ').any(|w| w == trimmed.to_lowercase()) && contains_phrase(lowered, c));

        (is_capitalized || is_acronym) && !in_country_list
    })
}
