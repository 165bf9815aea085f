//! Claim grouping and agreement analysis
//!
//! Claims from successful sources are grouped by (subject, predicate)
//! and compared. Numeric values agree when they fall within a relative
//! tolerance of each other; booleans and text must match exactly
//! (text case-insensitively).

use std::collections::BTreeMap;

use crate::source::ClaimValue;

use super::types::{Conflict, ConflictValue, Corroboration};

/// One source's claim inside a group, with its quality weight
#[derive(Debug, Clone)]
pub(crate) struct SourcedClaim {
    pub source: String,
    pub weight: f64,
    pub value: ClaimValue,
}

/// Whether two claim values agree under the given relative tolerance
pub(crate) fn values_agree(a: &ClaimValue, b: &ClaimValue, tolerance: f64) -> bool {
    match (a, b) {
        (ClaimValue::Number(x), ClaimValue::Number(y)) => {
            let scale = x.abs().max(y.abs());
            if scale == 0.0 {
                return true;
            }
            (x - y).abs() <= tolerance * scale
        }
        (ClaimValue::Bool(x), ClaimValue::Bool(y)) => x == y,
        (ClaimValue::Text(x), ClaimValue::Text(y)) => x.eq_ignore_ascii_case(y),
        // A number against a string is a disagreement, not a type error
        _ => false,
    }
}

/// Quality-weighted significance of a set of involved sources
fn significance(claims: &[SourcedClaim]) -> f64 {
    if claims.is_empty() {
        return 0.0;
    }
    let total: f64 = claims.iter().map(|c| c.weight).sum();
    total / claims.len() as f64
}

/// Compare grouped claims and split them into corroborations and conflicts
///
/// Groups reported by fewer than two distinct sources carry no
/// cross-source signal and are skipped. Within a multi-source group,
/// agreement must hold for every pair of values — tolerance is not
/// transitive, so an anchor-only check would let two values that
/// disagree beyond tolerance hide behind a middle value. Any pairwise
/// disagreement makes the whole group a conflict listing every stated
/// value, including repeated values from a self-inconsistent source.
/// A BTreeMap keyed by (subject, predicate) keeps output order
/// independent of source completion order.
pub(crate) fn analyze(
    grouped: BTreeMap<(String, String), Vec<SourcedClaim>>,
    tolerance: f64,
) -> (Vec<Corroboration>, Vec<Conflict>) {
    let mut corroborations = Vec::new();
    let mut conflicts = Vec::new();

    for ((subject, predicate), mut claims) in grouped {
        claims.sort_by(|a, b| a.source.cmp(&b.source));
        // A source restating the exact same value adds nothing; a source
        // contradicting itself stays visible
        let mut deduped: Vec<SourcedClaim> = Vec::new();
        for claim in claims {
            let repeat = deduped
                .iter()
                .any(|c| c.source == claim.source && c.value == claim.value);
            if !repeat {
                deduped.push(claim);
            }
        }

        let mut sources: Vec<String> = deduped.iter().map(|c| c.source.clone()).collect();
        sources.dedup();
        if sources.len() < 2 {
            continue;
        }

        let all_agree = deduped.iter().enumerate().all(|(i, a)| {
            deduped[i + 1..]
                .iter()
                .all(|b| values_agree(&a.value, &b.value, tolerance))
        });

        if all_agree {
            corroborations.push(Corroboration {
                subject,
                predicate,
                value: deduped[0].value.clone(),
                sources,
                significance: significance(&deduped),
            });
        } else {
            conflicts.push(Conflict {
                subject,
                predicate,
                values: deduped
                    .iter()
                    .map(|c| ConflictValue {
                        source: c.source.clone(),
                        value: c.value.clone(),
                    })
                    .collect(),
                significance: significance(&deduped),
            });
        }
    }

    (corroborations, conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(
        entries: &[(&str, &str, &str, f64, ClaimValue)],
    ) -> BTreeMap<(String, String), Vec<SourcedClaim>> {
        let mut grouped: BTreeMap<(String, String), Vec<SourcedClaim>> = BTreeMap::new();
        for (subject, predicate, source, weight, value) in entries {
            grouped
                .entry((subject.to_string(), predicate.to_string()))
                .or_default()
                .push(SourcedClaim {
                    source: source.to_string(),
                    weight: *weight,
                    value: value.clone(),
                });
        }
        grouped
    }

    #[test]
    fn test_numeric_agreement_within_tolerance() {
        assert!(values_agree(
            &ClaimValue::Number(100.0),
            &ClaimValue::Number(101.0),
            0.02
        ));
        assert!(!values_agree(
            &ClaimValue::Number(100.0),
            &ClaimValue::Number(105.0),
            0.02
        ));
        // Both zero is trivially agreement
        assert!(values_agree(
            &ClaimValue::Number(0.0),
            &ClaimValue::Number(0.0),
            0.02
        ));
    }

    #[test]
    fn test_text_agreement_is_case_insensitive() {
        assert!(values_agree(
            &ClaimValue::Text("Addis Ababa".to_string()),
            &ClaimValue::Text("addis ababa".to_string()),
            0.02
        ));
        assert!(!values_agree(
            &ClaimValue::Text("Addis Ababa".to_string()),
            &ClaimValue::Text("Nairobi".to_string()),
            0.02
        ));
    }

    #[test]
    fn test_mixed_types_never_agree() {
        assert!(!values_agree(
            &ClaimValue::Number(1.0),
            &ClaimValue::Text("1".to_string()),
            0.02
        ));
    }

    #[test]
    fn test_corroboration_from_agreeing_sources() {
        let grouped = group(&[
            ("Q115", "gdp_usd", "world_bank", 1.0, ClaimValue::Number(111.3e9)),
            ("Q115", "gdp_usd", "gdelt", 0.6, ClaimValue::Number(112.0e9)),
        ]);
        let (corr, conf) = analyze(grouped, 0.02);
        assert_eq!(corr.len(), 1);
        assert!(conf.is_empty());
        assert_eq!(corr[0].sources, vec!["gdelt", "world_bank"]);
        assert!((corr[0].significance - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_conflict_lists_every_stated_value() {
        let grouped = group(&[
            ("Q115", "fatalities", "acled", 1.0, ClaimValue::Number(120.0)),
            ("Q115", "fatalities", "gdelt", 0.6, ClaimValue::Number(450.0)),
        ]);
        let (corr, conf) = analyze(grouped, 0.02);
        assert!(corr.is_empty());
        assert_eq!(conf.len(), 1);
        assert_eq!(conf[0].values.len(), 2);
        assert_eq!(conf[0].values[0].source, "acled");
        assert_eq!(conf[0].values[1].source, "gdelt");
    }

    #[test]
    fn test_single_source_group_is_skipped() {
        let grouped = group(&[(
            "Q115",
            "gdp_usd",
            "world_bank",
            1.0,
            ClaimValue::Number(111.3e9),
        )]);
        let (corr, conf) = analyze(grouped, 0.02);
        assert!(corr.is_empty());
        assert!(conf.is_empty());
    }

    #[test]
    fn test_agreement_must_hold_pairwise() {
        // 98.04 and 101.96 disagree beyond 2% even though each sits
        // within tolerance of 100.0; the middle value must not mask that
        let grouped = group(&[
            ("Q115", "gdp_usd", "world_bank", 1.0, ClaimValue::Number(100.0)),
            ("Q115", "gdp_usd", "gdelt", 0.6, ClaimValue::Number(98.04)),
            ("Q115", "gdp_usd", "acled", 1.0, ClaimValue::Number(101.96)),
        ]);
        let (corr, conf) = analyze(grouped, 0.02);
        assert!(corr.is_empty());
        assert_eq!(conf.len(), 1);
        assert_eq!(conf[0].values.len(), 3);
    }

    #[test]
    fn test_self_inconsistent_source_surfaces_as_conflict() {
        let grouped = group(&[
            ("Q115", "fatalities", "gdelt", 0.6, ClaimValue::Number(100.0)),
            ("Q115", "fatalities", "gdelt", 0.6, ClaimValue::Number(400.0)),
            ("Q115", "fatalities", "acled", 1.0, ClaimValue::Number(100.0)),
        ]);
        let (corr, conf) = analyze(grouped, 0.02);
        assert!(corr.is_empty());
        assert_eq!(conf.len(), 1);
        // Both of the inconsistent source's values stay visible
        let gdelt_values = conf[0]
            .values
            .iter()
            .filter(|v| v.source == "gdelt")
            .count();
        assert_eq!(gdelt_values, 2);
    }

    #[test]
    fn test_duplicate_claims_from_one_source_count_once() {
        let grouped = group(&[
            ("Q115", "gdp_usd", "world_bank", 1.0, ClaimValue::Number(111.3e9)),
            ("Q115", "gdp_usd", "world_bank", 1.0, ClaimValue::Number(111.3e9)),
        ]);
        let (corr, conf) = analyze(grouped, 0.02);
        assert!(corr.is_empty());
        assert!(conf.is_empty());
    }
}
