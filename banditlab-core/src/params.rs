//! Canonical parameter sets — order-independent identity for arm configurations.
//!
//! Parameters are held in a `BTreeMap` so serialization always emits sorted
//! keys. Two configurations built from the same pairs in any insertion order
//! produce byte-identical canonical JSON, and therefore the same `ArmKey`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named set of numeric hyperparameters for one sub-strategy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, f64>);

impl ParamSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Parameter lookup with a fallback; keeps strategy code total when a
    /// seed omits an optional parameter.
    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Deterministic serialization: sorted keys, stable float formatting.
    ///
    /// This string is the persisted identity of the parameter set; hashing
    /// and equality both go through it.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&self.0).expect("BTreeMap<String, f64> must serialize")
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Content-addressed identity of an arm: blake3 of strategy id + canonical params.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArmKey(String);

impl ArmKey {
    pub fn derive(strategy_id: &str, params: &ParamSet) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(strategy_id.as_bytes());
        hasher.update(b"\n");
        hasher.update(params.canonical_json().as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
