//! Metric definitions scraped from job logs.
//!
//! The execution service extracts each metric with a regex over the job's
//! log stream. A training loop that logs in any other format produces an
//! empty metric history and no error anywhere. [`scan_log`] checks a captured
//! log against the definitions before that surprise happens in a real run.

use regex::Regex;
use serde::Serialize;
use trainlaunch_remote::MetricDefinition;

use crate::domain::algorithm::Algorithm;
use crate::domain::error::{LaunchError, Result};

const SIGNED_DECIMAL: &str = r"([0-9\.\-]+)";
const DECIMAL: &str = r"([0-9\.]+)";
const INTEGER: &str = r"([0-9]+)";

const COMMON: [(&str, &str); 6] = [
    ("episode_reward", SIGNED_DECIMAL),
    ("episode_length", INTEGER),
    ("episode_number", INTEGER),
    ("total_timesteps", INTEGER),
    ("exploration_rate", DECIMAL),
    ("loss", DECIMAL),
];

/// Prioritized replay.
const DRQN_EXTRA: [(&str, &str); 1] = [("per_beta", DECIMAL)];

const POLICY_GRADIENT_EXTRA: [(&str, &str); 5] = [
    ("policy_loss", SIGNED_DECIMAL),
    ("value_loss", SIGNED_DECIMAL),
    ("entropy_loss", SIGNED_DECIMAL),
    ("approx_kl", DECIMAL),
    ("clip_fraction", DECIMAL),
];

fn definition(name: &str, value_pattern: &str) -> MetricDefinition {
    MetricDefinition {
        name: name.to_string(),
        regex: format!("{}: {}", name, value_pattern),
    }
}

/// Metric definitions attached to jobs of `algorithm`, common ones first.
pub fn definitions_for(algorithm: Algorithm) -> Vec<MetricDefinition> {
    let extra: &[(&str, &str)] = match algorithm {
        Algorithm::Drqn => &DRQN_EXTRA,
        Algorithm::Dqn => &[],
        Algorithm::Ppo | Algorithm::RecurrentPpo => &POLICY_GRADIENT_EXTRA,
    };
    COMMON
        .iter()
        .chain(extra.iter())
        .map(|(name, pattern)| definition(name, pattern))
        .collect()
}

/// How one definition fared against a captured log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCoverage {
    pub name: String,
    pub matches: usize,
    pub last_value: Option<String>,
}

impl MetricCoverage {
    pub fn is_covered(&self) -> bool {
        self.matches > 0
    }
}

/// Count matches of every definition in `log`.
pub fn scan_log(definitions: &[MetricDefinition], log: &str) -> Result<Vec<MetricCoverage>> {
    definitions
        .iter()
        .map(|def| {
            let re = Regex::new(&def.regex).map_err(|e| LaunchError::InvalidConfig {
                document: format!("metric {}", def.name),
                reason: e.to_string(),
            })?;
            let mut matches = 0;
            let mut last_value = None;
            for caps in re.captures_iter(log) {
                matches += 1;
                last_value = caps.get(1).map(|m| m.as_str().to_string());
            }
            Ok(MetricCoverage {
                name: def.name.clone(),
                matches,
                last_value,
            })
        })
        .collect()
}
