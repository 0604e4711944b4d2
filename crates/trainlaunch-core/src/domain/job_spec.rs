//! The submission-ready job descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trainlaunch_remote::{
    AlgorithmSpecification, Channel, CheckpointConfig, CreateTrainingJob, MetricDefinition,
    OutputDataConfig, ResourceConfig, StoppingCondition, Tag, TensorBoardOutputConfig, VpcConfig,
};

use crate::domain::algorithm::{Algorithm, ComputeClass, ExecutionMode};

/// Mount point of the checkpoint directory inside the job container.
pub const LOCAL_CHECKPOINT_PATH: &str = "/opt/ml/checkpoints";
/// Mount point of the tensorboard directory inside the job container.
pub const LOCAL_TENSORBOARD_PATH: &str = "/opt/ml/output/tensorboard";

/// Top-level output prefixes. Downstream tooling discovers runs by these.
pub const MODELS_PREFIX: &str = "models";
pub const CHECKPOINTS_PREFIX: &str = "checkpoints";
pub const TENSORBOARD_PREFIX: &str = "tensorboard";

/// Output locations under the artifacts bucket, one per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub bucket: String,
    /// `models/<algorithm>/<job>/`
    pub model_prefix: String,
    /// `checkpoints/<algorithm>/<job>/`
    pub checkpoint_prefix: String,
    /// `tensorboard/<algorithm>/<job>/`
    pub tensorboard_prefix: String,
}

impl OutputPaths {
    pub fn new(bucket: &str, algorithm: Algorithm, job_name: &str) -> Self {
        let under = |top: &str| format!("{}/{}/{}/", top, algorithm.id(), job_name);
        Self {
            bucket: bucket.to_string(),
            model_prefix: under(MODELS_PREFIX),
            checkpoint_prefix: under(CHECKPOINTS_PREFIX),
            tensorboard_prefix: under(TENSORBOARD_PREFIX),
        }
    }

    pub fn uri(&self, prefix: &str) -> String {
        format!("s3://{}/{}", self.bucket, prefix)
    }
}

/// Read-only input mounted into the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputChannel {
    pub name: String,
    pub prefix: String,
}

/// Network placement of the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NetworkMode {
    /// Service-managed networking
    #[default]
    Default,
    /// Private subnets, required to reach emulated infrastructure
    Isolated {
        subnets: Vec<String>,
        security_group_ids: Vec<String>,
    },
}

/// Runtime limits. `max_wait_secs` is only set for spot capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppingLimits {
    pub max_runtime_secs: u64,
    pub max_wait_secs: Option<u64>,
}

/// Fully resolved, submission-ready job descriptor.
///
/// Only `JobSpecBuilder` constructs these, and only after every artifact
/// was confirmed present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_name: String,
    pub algorithm: Algorithm,
    pub scenario: String,
    pub execution_mode: ExecutionMode,
    pub image_uri: String,
    pub role_arn: String,
    pub compute_class: ComputeClass,
    pub instance_count: u32,
    pub volume_size_gb: u32,
    pub network: NetworkMode,
    /// Job metadata; never subject to the hyperparameter display cap.
    pub environment: BTreeMap<String, String>,
    /// Visible hyperparameter channel, capped, in set order.
    pub hyperparameters: Vec<(String, String)>,
    /// Names that did not fit the visible channel. Still delivered via the environment.
    pub overflow_hyperparameters: Vec<String>,
    pub outputs: OutputPaths,
    pub inputs: Vec<InputChannel>,
    pub metrics: Vec<MetricDefinition>,
    pub stopping: StoppingLimits,
    pub spot: bool,
    pub tags: Vec<Tag>,
    /// Digest of everything except name-derived fields.
    pub spec_digest: String,
}

impl JobSpec {
    pub fn hyperparameter(&self, name: &str) -> Option<&str> {
        self.hyperparameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert to the execution service's wire descriptor.
    pub fn to_descriptor(&self) -> CreateTrainingJob {
        CreateTrainingJob {
            training_job_name: self.job_name.clone(),
            role_arn: self.role_arn.clone(),
            algorithm_specification: AlgorithmSpecification {
                training_image: self.image_uri.clone(),
                training_input_mode: "File".to_string(),
                metric_definitions: self.metrics.clone(),
            },
            environment: self.environment.clone(),
            resource_config: ResourceConfig {
                instance_type: self.compute_class.instance_type().to_string(),
                instance_count: self.instance_count,
                volume_size_in_gb: self.volume_size_gb,
            },
            stopping_condition: StoppingCondition {
                max_runtime_in_seconds: self.stopping.max_runtime_secs,
                max_wait_time_in_seconds: self.stopping.max_wait_secs,
            },
            input_data_config: self
                .inputs
                .iter()
                .map(|c| Channel::prefix(&c.name, self.outputs.uri(&c.prefix)))
                .collect(),
            output_data_config: OutputDataConfig {
                s3_output_path: self.outputs.uri(&self.outputs.model_prefix),
            },
            hyper_parameters: self.hyperparameters.iter().cloned().collect(),
            checkpoint_config: CheckpointConfig {
                s3_uri: self.outputs.uri(&self.outputs.checkpoint_prefix),
                local_path: LOCAL_CHECKPOINT_PATH.to_string(),
            },
            tensor_board_output_config: TensorBoardOutputConfig {
                s3_output_path: self.outputs.uri(&self.outputs.tensorboard_prefix),
                local_path: LOCAL_TENSORBOARD_PATH.to_string(),
            },
            enable_managed_spot_training: self.spot,
            vpc_config: match &self.network {
                NetworkMode::Default => None,
                NetworkMode::Isolated {
                    subnets,
                    security_group_ids,
                } => Some(VpcConfig {
                    subnets: subnets.clone(),
                    security_group_ids: security_group_ids.clone(),
                }),
            },
            tags: self.tags.clone(),
        }
    }
}
