//! Hyperparameter resolution.
//!
//! Layers, lowest first: the algorithm's base `hyperparameters:` section,
//! the `modes.<mode>:` section for the requested execution mode, then caller
//! overrides. A later layer replaces a key's value and provenance without
//! moving it. The request-owned keys (`algorithm`, `total_steps`, `seed`)
//! come first and are never shadowed: documents cannot set them and
//! overrides naming them are rejected.

use std::sync::Arc;

use serde_yaml::Value;
use trainlaunch_remote::ConfigStore;

use crate::domain::error::{LaunchError, Result};
use crate::domain::hyperparams::{HyperValue, HyperparameterSet, Provenance};
use crate::domain::request::{JobRequest, REQUEST_OWNED_KEYS};
use crate::obs;

const HYPERPARAMETERS_KEY: &str = "hyperparameters";
const MODES_KEY: &str = "modes";

/// Resolves a request into an ordered, provenance-tagged hyperparameter set.
#[derive(Clone)]
pub struct ConfigResolver {
    store: Arc<dyn ConfigStore>,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Same request and store content always yield an identical set.
    pub fn resolve(&self, request: &JobRequest) -> Result<HyperparameterSet> {
        let overrides = request.parsed_overrides()?;
        let algorithm = request.algorithm;
        let document = format!("algorithms/{}.yaml", algorithm.id());

        let raw = self
            .store
            .algorithm_config(algorithm.id())?
            .ok_or_else(|| LaunchError::ConfigNotFound {
                algorithm: algorithm.id().to_string(),
            })?;
        let config = parse_document(&document, &raw)?;

        let scenario = request.scenario_name();
        if let Some(raw) = self.store.scenario(&scenario)? {
            parse_document(&format!("scenario {}", scenario), &raw)?;
        }

        let mut set = HyperparameterSet::new();
        set.insert(
            "algorithm",
            HyperValue::Str(algorithm.id().to_string()),
            Provenance::Default,
        );
        set.insert(
            "total_steps",
            int_value(request.total_steps),
            Provenance::Default,
        );
        if let Some(seed) = request.seed {
            set.insert("seed", int_value(seed), Provenance::Default);
        }

        let base = section(&document, &config, HYPERPARAMETERS_KEY)?;
        let mode_name = request.execution_mode.name();
        let mode = section(&document, &config, MODES_KEY)
            .and_then(|modes| section(&document, modes, mode_name))?;
        for layer in [base, mode] {
            for (name, value) in flatten(&document, layer)? {
                if REQUEST_OWNED_KEYS.contains(&name.as_str()) {
                    obs::emit_request_owned_key_ignored(&document, &name);
                    continue;
                }
                set.insert(&name, value, Provenance::File);
            }
        }

        for o in overrides {
            set.insert(&o.key, o.value, Provenance::Override);
        }

        let count = |p: Provenance| set.iter().filter(|e| e.provenance == p).count();
        obs::emit_resolved(set.len(), count(Provenance::File), count(Provenance::Override));
        Ok(set)
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver").finish_non_exhaustive()
    }
}

fn int_value(v: u64) -> HyperValue {
    i64::try_from(v)
        .map(HyperValue::Int)
        .unwrap_or_else(|_| HyperValue::Str(v.to_string()))
}

fn invalid(document: &str, reason: impl Into<String>) -> LaunchError {
    LaunchError::InvalidConfig {
        document: document.to_string(),
        reason: reason.into(),
    }
}

fn parse_document(document: &str, raw: &str) -> Result<Value> {
    let value: Value =
        serde_yaml::from_str(raw).map_err(|e| invalid(document, e.to_string()))?;
    match value {
        Value::Null | Value::Mapping(_) => Ok(value),
        _ => Err(invalid(document, "top level must be a mapping")),
    }
}

/// A mapping-valued key, or `Null` when absent.
fn section<'a>(document: &str, parent: &'a Value, key: &str) -> Result<&'a Value> {
    static NULL: Value = Value::Null;
    match parent.get(key) {
        None => Ok(&NULL),
        Some(v @ (Value::Null | Value::Mapping(_))) => Ok(v),
        Some(_) => Err(invalid(document, format!("'{}' must be a mapping", key))),
    }
}

/// Flatten a mapping into dotted scalar entries in document order.
fn flatten(document: &str, value: &Value) -> Result<Vec<(String, HyperValue)>> {
    let mut out = Vec::new();
    flatten_into(document, "", value, &mut out)?;
    Ok(out)
}

fn flatten_into(
    document: &str,
    prefix: &str,
    value: &Value,
    out: &mut Vec<(String, HyperValue)>,
) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err(invalid(document, "mapping keys must be scalars")),
                };
                let name = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(document, &name, v, out)?;
            }
        }
        Value::Tagged(tagged) => flatten_into(document, prefix, &tagged.value, out)?,
        scalar_or_seq => {
            if prefix.is_empty() {
                return Err(invalid(document, "expected a mapping of hyperparameters"));
            }
            out.push((prefix.to_string(), to_hyper_value(document, scalar_or_seq)?));
        }
    }
    Ok(())
}

fn to_hyper_value(document: &str, value: &Value) -> Result<HyperValue> {
    Ok(match value {
        Value::Bool(b) => HyperValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                HyperValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                HyperValue::Str(u.to_string())
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => HyperValue::Float(f),
                    _ => HyperValue::Str(n.to_string()),
                }
            }
        }
        Value::String(s) => HyperValue::Str(s.clone()),
        other => HyperValue::Str(
            serde_json::to_string(other).map_err(|e| invalid(document, e.to_string()))?,
        ),
    })
}
