//! Launcher settings.
//!
//! Settings are loaded once at the edge (TOML file, then `TRAINLAUNCH_*`
//! environment overrides) and passed into the pipeline explicitly. No
//! component reads process environment on its own.
//!
//! ```toml
//! region = "us-east-1"
//! bucket = "rl-artifacts"
//! training_repository = "123456789012.dkr.ecr.us-east-1.amazonaws.com/rl/training"
//! role_arn = "arn:aws:iam::123456789012:role/training"
//!
//! [network]
//! subnets = ["subnet-a"]
//! security_group_ids = ["sg-1"]
//!
//! [endpoints.registry]
//! base_url = "https://123456789012.dkr.ecr.us-east-1.amazonaws.com"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trainlaunch_remote::RemoteEndpoint;

use crate::domain::algorithm::Algorithm;
use crate::domain::error::{LaunchError, Result};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PROJECT: &str = "trainlaunch";
pub const DEFAULT_IMAGE_TAG: &str = "latest";
/// Console limit on visible hyperparameters.
pub const DEFAULT_HYPERPARAMETER_DISPLAY_LIMIT: usize = 16;
pub const DEFAULT_VOLUME_SIZE_GB: u32 = 30;
/// 48 hours.
pub const DEFAULT_SPOT_MAX_WAIT_SECS: u64 = 172_800;
pub const DEFAULT_CONFIG_PREFIX: &str = "configs";

/// Private network placement for emulation jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub subnets: Vec<String>,
    pub security_group_ids: Vec<String>,
}

/// HTTP endpoints for the remote collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(default)]
    pub registry: Option<RemoteEndpoint>,
    #[serde(default)]
    pub object_store: Option<RemoteEndpoint>,
    #[serde(default)]
    pub execution: Option<RemoteEndpoint>,
}

/// Settings file as written; every field optional so the environment can fill gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsFile {
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub training_repository: Option<String>,
    pub role_arn: Option<String>,
    pub project: Option<String>,
    pub image_tag: Option<String>,
    pub hyperparameter_display_limit: Option<usize>,
    pub volume_size_gb: Option<u32>,
    pub spot_max_wait_secs: Option<u64>,
    pub config_prefix: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub network: Option<NetworkSettings>,
    #[serde(default)]
    pub endpoints: EndpointSettings,
}

impl SettingsFile {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LaunchError::Settings(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LaunchError::Settings(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Resolved launcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSettings {
    pub region: String,
    /// Artifacts bucket holding configs and receiving outputs
    pub bucket: String,
    /// Training image repository, without tag
    pub training_repository: String,
    /// Execution role assumed by the job
    pub role_arn: String,
    pub project: String,
    pub image_tag: String,
    pub hyperparameter_display_limit: usize,
    pub volume_size_gb: u32,
    pub spot_max_wait_secs: u64,
    /// Prefix of uploaded configs inside the bucket
    pub config_prefix: String,
    /// Local directory mirroring the uploaded configs
    pub config_dir: PathBuf,
    pub network: Option<NetworkSettings>,
    pub endpoints: EndpointSettings,
}

impl LaunchSettings {
    /// Minimal settings with defaults for everything optional.
    pub fn new(bucket: &str, training_repository: &str, role_arn: &str) -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            bucket: bucket.to_string(),
            training_repository: training_repository.to_string(),
            role_arn: role_arn.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            image_tag: DEFAULT_IMAGE_TAG.to_string(),
            hyperparameter_display_limit: DEFAULT_HYPERPARAMETER_DISPLAY_LIMIT,
            volume_size_gb: DEFAULT_VOLUME_SIZE_GB,
            spot_max_wait_secs: DEFAULT_SPOT_MAX_WAIT_SECS,
            config_prefix: DEFAULT_CONFIG_PREFIX.to_string(),
            config_dir: PathBuf::from(DEFAULT_CONFIG_PREFIX),
            network: None,
            endpoints: EndpointSettings::default(),
        }
    }

    pub fn with_network(mut self, network: NetworkSettings) -> Self {
        self.network = Some(network);
        self
    }

    /// Load from an optional TOML file, then apply `TRAINLAUNCH_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => SettingsFile::load(p)?,
            None => SettingsFile::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a settings file with environment lookups. Environment wins.
    pub fn resolve(file: SettingsFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pick = |key: &str, from_file: Option<String>| env(key).or(from_file);
        let require = |key: &str, field: &str, from_file: Option<String>| {
            pick(key, from_file)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    LaunchError::Settings(format!(
                        "'{}' is required (settings file or {})",
                        field, key
                    ))
                })
        };
        let parse_num = |key: &str| -> Result<Option<u64>> {
            env(key)
                .map(|v| {
                    v.parse::<u64>().map_err(|_| {
                        LaunchError::Settings(format!("{} must be a positive integer", key))
                    })
                })
                .transpose()
        };

        let bucket = require("TRAINLAUNCH_BUCKET", "bucket", file.bucket)?;
        let training_repository = require(
            "TRAINLAUNCH_TRAINING_REPOSITORY",
            "training_repository",
            file.training_repository,
        )?;
        let role_arn = require("TRAINLAUNCH_ROLE_ARN", "role_arn", file.role_arn)?;

        let hyperparameter_display_limit = parse_num("TRAINLAUNCH_HYPERPARAMETER_LIMIT")?
            .map(|v| v as usize)
            .or(file.hyperparameter_display_limit)
            .unwrap_or(DEFAULT_HYPERPARAMETER_DISPLAY_LIMIT);
        if hyperparameter_display_limit == 0 {
            return Err(LaunchError::Settings(
                "hyperparameter_display_limit must be > 0".to_string(),
            ));
        }

        let settings = Self {
            region: pick("TRAINLAUNCH_REGION", file.region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            bucket,
            training_repository: training_repository.trim_end_matches('/').to_string(),
            role_arn,
            project: pick("TRAINLAUNCH_PROJECT", file.project)
                .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            image_tag: pick("TRAINLAUNCH_IMAGE_TAG", file.image_tag)
                .unwrap_or_else(|| DEFAULT_IMAGE_TAG.to_string()),
            hyperparameter_display_limit,
            volume_size_gb: file.volume_size_gb.unwrap_or(DEFAULT_VOLUME_SIZE_GB),
            spot_max_wait_secs: parse_num("TRAINLAUNCH_SPOT_MAX_WAIT_SECS")?
                .or(file.spot_max_wait_secs)
                .unwrap_or(DEFAULT_SPOT_MAX_WAIT_SECS),
            config_prefix: file
                .config_prefix
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_CONFIG_PREFIX.to_string()),
            config_dir: env("TRAINLAUNCH_CONFIG_DIR")
                .map(PathBuf::from)
                .or(file.config_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PREFIX)),
            network: file.network,
            endpoints: file.endpoints,
        };
        Ok(settings)
    }

    /// Object key of an algorithm's config upload.
    pub fn algorithm_config_key(&self, algorithm: Algorithm) -> String {
        format!("{}/algorithms/{}.yaml", self.config_prefix, algorithm.id())
    }

    /// Object key of a scenario upload.
    pub fn scenario_key(&self, scenario: &str) -> String {
        format!("{}/environments/scenarios/{}", self.config_prefix, scenario)
    }

    pub fn algorithms_prefix(&self) -> String {
        format!("{}/algorithms/", self.config_prefix)
    }

    pub fn scenarios_prefix(&self) -> String {
        format!("{}/environments/scenarios/", self.config_prefix)
    }

    pub fn image_uri(&self, tag: &str) -> String {
        format!("{}:{}", self.training_repository, tag)
    }

    pub fn console_url(&self, job_name: &str) -> String {
        format!(
            "https://console.aws.amazon.com/sagemaker/home?region={}#/jobs/{}",
            self.region, job_name
        )
    }

    pub fn log_url(&self, job_name: &str) -> String {
        format!(
            "https://console.aws.amazon.com/cloudwatch/home?region={}#logsV2:log-groups/log-group/$252Faws$252Fsagemaker$252FTrainingJobs$3FlogStreamNameFilter$3D{}",
            self.region, job_name
        )
    }
}
