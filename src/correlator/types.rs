//! Result types for cross-source correlation

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resolver::EntityMatch;
use crate::source::{Attribution, ClaimValue};

/// Per-source outcome status
///
/// `NoData` is distinct from `Error`: a source that completes but holds
/// nothing is an expected, non-exceptional outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Ok,
    Timeout,
    Error,
    NoData,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Ok => write!(f, "ok"),
            OutcomeStatus::Timeout => write!(f, "timeout"),
            OutcomeStatus::Error => write!(f, "error"),
            OutcomeStatus::NoData => write!(f, "no_data"),
        }
    }
}

/// What one selected source produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub status: OutcomeStatus,

    /// Payload for successful calls, `Null` otherwise
    pub payload: serde_json::Value,

    /// Failure detail for `Timeout`/`Error` outcomes
    pub error_detail: Option<String>,

    /// Attribution metadata for completed calls
    pub attribution: Option<Attribution>,
}

impl SourceOutcome {
    pub fn ok(payload: serde_json::Value, attribution: Attribution) -> Self {
        Self {
            status: OutcomeStatus::Ok,
            payload,
            error_detail: None,
            attribution: Some(attribution),
        }
    }

    pub fn no_data(attribution: Attribution) -> Self {
        Self {
            status: OutcomeStatus::NoData,
            payload: serde_json::Value::Null,
            error_detail: None,
            attribution: Some(attribution),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Timeout,
            payload: serde_json::Value::Null,
            error_detail: Some(detail.into()),
            attribution: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Error,
            payload: serde_json::Value::Null,
            error_detail: Some(detail.into()),
            attribution: None,
        }
    }
}

/// Two or more sources independently reporting the same value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corroboration {
    pub subject: String,
    pub predicate: String,

    /// The agreed value (representative; all agreeing values lie within
    /// tolerance of each other)
    pub value: ClaimValue,

    /// Agreeing sources, sorted
    pub sources: Vec<String>,

    /// Quality-tier-weighted significance in [0, 1]
    pub significance: f64,
}

/// Sources reporting materially different values for the same claim
///
/// Conflicts are surfaced, never resolved: adjudicating truth is a
/// presentation concern, not this layer's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub subject: String,
    pub predicate: String,

    /// Each source's stated value, sorted by source tag
    pub values: Vec<ConflictValue>,

    /// Quality-tier-weighted significance in [0, 1]
    pub significance: f64,
}

/// One source's stated value in a conflict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictValue {
    pub source: String,
    pub value: ClaimValue,
}

/// The correlator's aggregate output
///
/// Every selected source appears exactly once in `per_source`,
/// regardless of success or failure, so callers can always show source
/// coverage. Results are merged by source tag, never by arrival order:
/// re-running with sources completing in a different order yields an
/// identical result aside from `elapsed_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// The original query
    pub query: String,

    /// Entity resolution outcome, when the query was entity-shaped and
    /// a resolver was attached
    pub entity: Option<EntityMatch>,

    /// Outcome per selected source, keyed by source tag
    pub per_source: BTreeMap<String, SourceOutcome>,

    /// Claims at least two sources agree on
    pub corroborations: Vec<Corroboration>,

    /// Claims sources disagree on
    pub conflicts: Vec<Conflict>,

    /// Wall-clock duration of the correlation (timing metadata only)
    pub elapsed_ms: u64,
}

impl CorrelationResult {
    /// Sources that returned usable data
    pub fn successful_sources(&self) -> Vec<&str> {
        self.per_source
            .iter()
            .filter(|(_, o)| o.status == OutcomeStatus::Ok)
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    /// Sources that failed or timed out
    pub fn failed_sources(&self) -> Vec<&str> {
        self.per_source
            .iter()
            .filter(|(_, o)| {
                matches!(o.status, OutcomeStatus::Error | OutcomeStatus::Timeout)
            })
            .map(|(tag, _)| tag.as_str())
            .collect()
    }
}
