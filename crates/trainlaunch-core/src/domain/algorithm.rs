//! Algorithm, execution mode and compute class identifiers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::LaunchError;

/// Supported training algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Deep recurrent Q-network with prioritized replay
    Drqn,
    Dqn,
    Ppo,
    RecurrentPpo,
}

/// Algorithm families drive compute sizing and metric selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmFamily {
    ValueBased,
    PolicyGradient,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Drqn,
        Algorithm::Dqn,
        Algorithm::Ppo,
        Algorithm::RecurrentPpo,
    ];

    /// Wire id, also the config document key.
    pub fn id(&self) -> &'static str {
        match self {
            Algorithm::Drqn => "drqn",
            Algorithm::Dqn => "dqn",
            Algorithm::Ppo => "ppo",
            Algorithm::RecurrentPpo => "recurrent_ppo",
        }
    }

    pub fn family(&self) -> AlgorithmFamily {
        match self {
            Algorithm::Drqn | Algorithm::Dqn => AlgorithmFamily::ValueBased,
            Algorithm::Ppo | Algorithm::RecurrentPpo => AlgorithmFamily::PolicyGradient,
        }
    }

    /// Scenario file used when the request names none.
    pub fn default_scenario(&self) -> String {
        format!("{}_scenario.yaml", self.id())
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Algorithm {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.id() == s)
            .ok_or_else(|| {
                LaunchError::InvalidRequest(format!(
                    "unknown algorithm '{}' (expected one of: drqn, dqn, ppo, recurrent_ppo)",
                    s
                ))
            })
    }
}

/// Where the agent's environment runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Pure simulation inside the job container
    #[default]
    Simulation,
    /// Emulated infrastructure reachable over an isolated network
    Emulation,
}

impl ExecutionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Simulation => "simulation",
            ExecutionMode::Emulation => "emulation",
        }
    }

    /// Value the training container expects in `ENVIRONMENT_MODE`.
    pub fn container_value(&self) -> &'static str {
        match self {
            ExecutionMode::Simulation => "sim",
            ExecutionMode::Emulation => "aws",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutionMode {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simulation" | "sim" => Ok(ExecutionMode::Simulation),
            "emulation" | "aws" => Ok(ExecutionMode::Emulation),
            other => Err(LaunchError::InvalidRequest(format!(
                "unknown execution mode '{}' (expected simulation or emulation)",
                other
            ))),
        }
    }
}

/// Instance types the launcher knows how to size for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ComputeClass {
    #[serde(rename = "ml.g4dn.xlarge")]
    G4dnXlarge,
    #[serde(rename = "ml.g4dn.2xlarge")]
    G4dn2xlarge,
    #[serde(rename = "ml.g5.xlarge")]
    G5Xlarge,
}

impl ComputeClass {
    pub const ALL: [ComputeClass; 3] = [
        ComputeClass::G4dnXlarge,
        ComputeClass::G4dn2xlarge,
        ComputeClass::G5Xlarge,
    ];

    pub fn instance_type(&self) -> &'static str {
        match self {
            ComputeClass::G4dnXlarge => "ml.g4dn.xlarge",
            ComputeClass::G4dn2xlarge => "ml.g4dn.2xlarge",
            ComputeClass::G5Xlarge => "ml.g5.xlarge",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ComputeClass::G4dnXlarge => "4 vCPUs, 16GB RAM, 1x T4 GPU",
            ComputeClass::G4dn2xlarge => "8 vCPUs, 32GB RAM, 1x T4 GPU",
            ComputeClass::G5Xlarge => "4 vCPUs, 16GB RAM, 1x A10G GPU",
        }
    }
}

impl std::fmt::Display for ComputeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.instance_type())
    }
}

impl FromStr for ComputeClass {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComputeClass::ALL
            .into_iter()
            .find(|c| c.instance_type() == s)
            .ok_or_else(|| {
                LaunchError::InvalidRequest(format!("unsupported instance type '{}'", s))
            })
    }
}
