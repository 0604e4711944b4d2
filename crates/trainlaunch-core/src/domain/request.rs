//! Caller intent: the job request and its `key=value` overrides.

use serde::{Deserialize, Serialize};

use crate::domain::algorithm::{Algorithm, ComputeClass, ExecutionMode};
use crate::domain::error::{LaunchError, Result};
use crate::domain::hyperparams::HyperValue;

/// A launch request as the caller expressed it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRequest {
    pub algorithm: Algorithm,

    /// Scenario file name; defaults to `<algorithm>_scenario.yaml`.
    pub scenario: Option<String>,

    /// Total environment steps. Must be positive.
    pub total_steps: u64,

    /// Explicit instance type; the per-algorithm policy applies when `None`.
    pub compute_class: Option<ComputeClass>,

    pub execution_mode: ExecutionMode,

    pub seed: Option<u64>,

    /// Use discounted, preemptible capacity.
    pub spot: bool,

    /// Training image tag; settings default when `None`.
    pub image_tag: Option<String>,

    /// Raw `key=value` strings, applied last.
    pub overrides: Vec<String>,
}

impl JobRequest {
    /// Request with defaults: no scenario, policy compute, simulation, spot on.
    pub fn new(algorithm: Algorithm, total_steps: u64) -> Self {
        Self {
            algorithm,
            scenario: None,
            total_steps,
            compute_class: None,
            execution_mode: ExecutionMode::Simulation,
            seed: None,
            spot: true,
            image_tag: None,
            overrides: Vec::new(),
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_compute_class(mut self, class: ComputeClass) -> Self {
        self.compute_class = Some(class);
        self
    }

    pub fn with_override(mut self, raw: impl Into<String>) -> Self {
        self.overrides.push(raw.into());
        self
    }

    pub fn without_spot(mut self) -> Self {
        self.spot = false;
        self
    }

    /// Scenario name after applying the algorithm default.
    pub fn scenario_name(&self) -> String {
        match &self.scenario {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => self.algorithm.default_scenario(),
        }
    }

    /// Check request invariants. Fails before any store is touched.
    pub fn validate(&self) -> Result<()> {
        if self.total_steps == 0 {
            return Err(LaunchError::InvalidRequest(
                "total_steps must be > 0".to_string(),
            ));
        }
        if let Some(tag) = &self.image_tag {
            if tag.trim().is_empty() {
                return Err(LaunchError::InvalidRequest(
                    "image tag cannot be empty".to_string(),
                ));
            }
        }
        for raw in &self.overrides {
            Override::parse(raw)?;
        }
        Ok(())
    }

    /// Parse every override, failing on the first malformed one.
    pub fn parsed_overrides(&self) -> Result<Vec<Override>> {
        self.overrides.iter().map(|raw| Override::parse(raw)).collect()
    }
}

/// A parsed `key=value` override.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub key: String,
    pub value: HyperValue,
}

/// Keys the request itself owns. Overriding them would make the job's
/// metadata, output paths and hyperparameters disagree.
pub const REQUEST_OWNED_KEYS: [&str; 3] = ["algorithm", "total_steps", "seed"];

impl Override {
    /// Split on the first `=`. The key is trimmed and must be non-empty and
    /// not request-owned; the value is kept verbatim and coerced.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| LaunchError::InvalidOverride {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| invalid("expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if REQUEST_OWNED_KEYS.contains(&key) {
            return Err(invalid(
                "set by the request itself; use --algorithm, --total-steps or --seed",
            ));
        }
        Ok(Self {
            key: key.to_string(),
            value: HyperValue::coerce(value),
        })
    }
}
