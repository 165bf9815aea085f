//! Curated registry of known entities
//!
//! A small, locally maintained set of `(id, canonical label)` pairs that
//! the resolver's exact, normalized, and fuzzy tiers match against.
//! Normalized labels are precomputed on insert so lookups stay pure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::resolver::normalize::normalize;

/// One curated entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Canonical identity (e.g. a Wikidata QID)
    pub id: String,

    /// Canonical label
    pub label: String,
}

/// Registry of curated entities with exact and normalized lookup maps
#[derive(Default)]
pub struct EntityRegistry {
    records: Vec<EntityRecord>,

    /// Case-sensitive label -> index
    by_label: HashMap<String, usize>,

    /// Normalized label -> index
    by_normalized: HashMap<String, usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with a handful of prominent entities, enough for
    /// demos and tests
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (id, label) in [
            ("Q7747", "Vladimir Putin"),
            ("Q15031", "Xi Jinping"),
            ("Q3052772", "Emmanuel Macron"),
            ("Q567", "Angela Merkel"),
            ("Q1065", "United Nations"),
            ("Q7184", "NATO"),
            ("Q102180", "Gazprom"),
            ("Q83164", "Rosneft"),
        ] {
            registry.insert(id, label);
        }
        registry
    }

    /// Add an entity. A duplicate label overwrites the earlier mapping.
    pub fn insert(&mut self, id: impl Into<String>, label: impl Into<String>) {
        let record = EntityRecord {
            id: id.into(),
            label: label.into(),
        };
        let index = self.records.len();
        self.by_label.insert(record.label.clone(), index);
        self.by_normalized.insert(normalize(&record.label), index);
        self.records.push(record);
    }

    /// Case-sensitive exact lookup
    pub fn find_exact(&self, label: &str) -> Option<&EntityRecord> {
        self.by_label.get(label).map(|&i| &self.records[i])
    }

    /// Lookup by pre-normalized label
    pub fn find_normalized(&self, normalized: &str) -> Option<&EntityRecord> {
        self.by_normalized.get(normalized).map(|&i| &self.records[i])
    }

    /// Iterate over all records (fuzzy matching, suggestions)
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter()
    }

    /// Number of curated entities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
