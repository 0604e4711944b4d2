//! Wire descriptor accepted by the execution service.
//!
//! Field names follow the service's PascalCase JSON convention. Every value
//! that reaches the job (hyperparameters, environment) is a string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request body for creating a training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTrainingJob {
    pub training_job_name: String,
    pub role_arn: String,
    pub algorithm_specification: AlgorithmSpecification,
    pub environment: BTreeMap<String, String>,
    pub resource_config: ResourceConfig,
    pub stopping_condition: StoppingCondition,
    pub input_data_config: Vec<Channel>,
    pub output_data_config: OutputDataConfig,
    pub hyper_parameters: BTreeMap<String, String>,
    pub checkpoint_config: CheckpointConfig,
    pub tensor_board_output_config: TensorBoardOutputConfig,
    pub enable_managed_spot_training: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vpc_config: Option<VpcConfig>,
    pub tags: Vec<Tag>,
}

/// Container image, input mode and metric extraction rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlgorithmSpecification {
    pub training_image: String,
    pub training_input_mode: String,
    pub metric_definitions: Vec<MetricDefinition>,
}

/// A metric scraped from the job's log stream by regex.
///
/// The first capture group of `regex` is the metric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDefinition {
    pub name: String,
    pub regex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceConfig {
    pub instance_type: String,
    pub instance_count: u32,
    #[serde(rename = "VolumeSizeInGB")]
    pub volume_size_in_gb: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoppingCondition {
    pub max_runtime_in_seconds: u64,
    /// Only set for spot capacity; must be >= `max_runtime_in_seconds`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_wait_time_in_seconds: Option<u64>,
}

/// Named input channel mounted into the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Channel {
    pub channel_name: String,
    pub data_source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataSource {
    pub s3_data_source: S3DataSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3DataSource {
    pub s3_data_type: String,
    pub s3_uri: String,
    pub s3_data_distribution_type: String,
}

impl Channel {
    /// Fully replicated prefix channel.
    pub fn prefix(name: &str, uri: String) -> Self {
        Self {
            channel_name: name.to_string(),
            data_source: DataSource {
                s3_data_source: S3DataSource {
                    s3_data_type: "S3Prefix".to_string(),
                    s3_uri: uri,
                    s3_data_distribution_type: "FullyReplicated".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputDataConfig {
    pub s3_output_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckpointConfig {
    pub s3_uri: String,
    pub local_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TensorBoardOutputConfig {
    pub s3_output_path: String,
    pub local_path: String,
}

/// Network isolation for jobs that must reach private resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcConfig {
    pub subnets: Vec<String>,
    pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response to a successful create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatedJob {
    #[serde(rename = "TrainingJobArn")]
    pub job_arn: String,
}
