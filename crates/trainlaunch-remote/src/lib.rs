//! Trainlaunch-Remote: collaborator layer for the training-job launcher
//!
//! Everything the launcher talks to lives behind a trait in this crate:
//! the configuration store it reads defaults from, the container registry
//! and object store it checks artifacts against, and the execution service
//! it submits jobs to.
//!
//! ## Layer 0 - Remote collaborators
//!
//! Focus: existence queries and a single create call. No retries here;
//! callers decide what a failure means.
//!
//! ## Key Components
//!
//! - `ConfigStore`, `ContainerRegistry`, `ObjectStore`, `ExecutionService`: the traits
//! - `CreateTrainingJob`: wire descriptor accepted by the execution service
//! - `FsConfigStore`: configuration store backed by a local directory
//! - `HttpRegistry`, `HttpObjectStore`, `HttpExecutionService`: HTTP clients
//! - `fakes`: in-memory implementations with failure injection for tests

mod error;
pub mod fakes;
pub mod fs_config;
pub mod http;
pub mod traits;
pub mod wire;

pub use error::RemoteError;
pub use fs_config::FsConfigStore;
pub use http::{HttpExecutionService, HttpObjectStore, HttpRegistry, RemoteEndpoint};
pub use traits::{ConfigStore, ContainerRegistry, ExecutionService, ObjectStore};
pub use wire::{
    AlgorithmSpecification, Channel, CheckpointConfig, CreateTrainingJob, CreatedJob,
    MetricDefinition, OutputDataConfig, ResourceConfig, S3DataSource, StoppingCondition, Tag,
    TensorBoardOutputConfig, VpcConfig,
};

/// Result type for collaborator operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
