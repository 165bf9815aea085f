//! Deterministic cache key construction
//!
//! A key uniquely determines `(collaborator, query type, parameters)`.
//! Parameters are canonicalized — sorted by name — before hashing, so
//! parameter order never affects the key. The fixed-length hash suffix
//! keeps keys short while leaving them human-scannable:
//! `{collaborator}:{query_type}:{12-hex-hash}`.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::cache::types::CacheKey;

/// Length of the hex digest suffix in characters
const HASH_SUFFIX_LEN: usize = 12;

/// Builder for deterministic cache keys
pub struct CacheKeyBuilder {
    collaborator: String,
    query_type: String,
    params: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    /// Create a builder for a collaborator and query type
    pub fn new(collaborator: impl Into<String>, query_type: impl Into<String>) -> Self {
        Self {
            collaborator: collaborator.into(),
            query_type: query_type.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter. Insertion order is irrelevant; the map keeps
    /// parameters sorted by name.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add every parameter from a sorted map
    pub fn params(mut self, params: &BTreeMap<String, String>) -> Self {
        for (name, value) in params {
            self.params.insert(name.clone(), value.clone());
        }
        self
    }

    /// Build the cache key
    pub fn build(self) -> CacheKey {
        // Canonical JSON-like serialization of sorted (name, value) pairs
        let pairs: Vec<[&str; 2]> = self
            .params
            .iter()
            .map(|(k, v)| [k.as_str(), v.as_str()])
            .collect();
        let canonical =
            serde_json::to_string(&pairs).unwrap_or_else(|_| String::from("[]"));

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hex::encode(hasher.finalize());

        format!(
            "{}:{}:{}",
            self.collaborator,
            self.query_type,
            &digest[..HASH_SUFFIX_LEN]
        )
    }
}
