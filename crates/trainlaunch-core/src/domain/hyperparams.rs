//! Hyperparameter values and the ordered, provenance-tagged set.

use serde::{Deserialize, Serialize};

/// A scalar hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl HyperValue {
    /// Coerce raw override text: integer, then finite float, then boolean
    /// (case-insensitive), else string. First match wins.
    pub fn coerce(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return HyperValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return HyperValue::Float(f);
            }
        }
        if raw.eq_ignore_ascii_case("true") {
            return HyperValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return HyperValue::Bool(false);
        }
        HyperValue::Str(raw.to_string())
    }

    /// String form sent to the job. Floats always carry a fractional part,
    /// booleans are lowercase.
    pub fn to_transport(&self) -> String {
        match self {
            HyperValue::Int(i) => i.to_string(),
            HyperValue::Float(f) => {
                let s = f.to_string();
                if s.contains('.') {
                    s
                } else {
                    format!("{}.0", s)
                }
            }
            HyperValue::Bool(b) => b.to_string(),
            HyperValue::Str(s) => s.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HyperValue::Int(_) => "int",
            HyperValue::Float(_) => "float",
            HyperValue::Bool(_) => "bool",
            HyperValue::Str(_) => "string",
        }
    }
}

impl std::fmt::Display for HyperValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_transport())
    }
}

/// Where a value came from. Later layers shadow earlier ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Derived from the request itself (algorithm, step budget, seed)
    Default,
    /// Base config document or its mode section
    File,
    /// Caller-supplied `key=value`
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterEntry {
    pub name: String,
    pub value: HyperValue,
    pub provenance: Provenance,
}

/// Insertion-ordered hyperparameters with one entry per key.
///
/// Re-inserting a key replaces value and provenance in place, so the
/// position of a key is where it first appeared. There are no public
/// mutators; sets are produced by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSet {
    entries: Vec<HyperparameterEntry>,
}

impl HyperparameterSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: HyperValue, provenance: Provenance) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.value = value;
                entry.provenance = provenance;
            }
            None => self.entries.push(HyperparameterEntry {
                name: name.to_string(),
                value,
                provenance,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HyperValue> {
        self.entry(name).map(|e| &e.value)
    }

    pub fn entry(&self, name: &str) -> Option<&HyperparameterEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HyperparameterEntry> {
        self.entries.iter()
    }

    /// Names and transport strings in set order.
    pub fn to_transport_map(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.value.to_transport()))
            .collect()
    }
}
