//! Collaborator trait definitions
//!
//! These traits are the only way the launcher reaches outside the process:
//! - `ConfigStore`: algorithm defaults and scenario definitions (read)
//! - `ContainerRegistry`: image existence by repository + tag (read)
//! - `ObjectStore`: object existence by bucket + key (read)
//! - `ExecutionService`: training job creation (write)
//!
//! In-memory fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;

use crate::wire::{CreateTrainingJob, CreatedJob};
use crate::RemoteResult;

/// Keyed configuration documents.
///
/// Returns `Ok(None)` when the document does not exist; errors are reserved
/// for documents that exist but cannot be read.
pub trait ConfigStore: Send + Sync {
    /// Raw hyperparameter document for an algorithm id (e.g. `"drqn"`).
    fn algorithm_config(&self, algorithm: &str) -> RemoteResult<Option<String>>;

    /// Raw scenario definition by file name (e.g. `"drqn_scenario.yaml"`).
    fn scenario(&self, name: &str) -> RemoteResult<Option<String>>;
}

/// Container image registry.
#[async_trait]
pub trait ContainerRegistry: Send + Sync {
    /// Whether `repository:tag` exists. Transport problems are errors, never `false`.
    async fn image_exists(&self, repository: &str, tag: &str) -> RemoteResult<bool>;
}

/// Object store holding configuration uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether `key` exists in `bucket`. Existence only, content is never read.
    async fn object_exists(&self, bucket: &str, key: &str) -> RemoteResult<bool>;
}

/// Remote job execution service.
///
/// Guarantees:
/// - Job names are unique within the service; a duplicate is `RemoteError::Rejected`.
/// - A successful call creates a durable, billable job.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Create a training job from a fully resolved descriptor.
    async fn create_training_job(&self, request: &CreateTrainingJob) -> RemoteResult<CreatedJob>;
}
