//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `MemoryConfigStore`, `MemoryRegistry`, `MemoryObjectStore` and
//! `MemoryExecutionService`. Each fake can be told to fail specific lookups
//! so callers can exercise partial-failure paths without a network.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::traits::*;
use crate::wire::{CreateTrainingJob, CreatedJob};
use crate::RemoteResult;

// ---------------------------------------------------------------------------
// MemoryConfigStore
// ---------------------------------------------------------------------------

/// In-memory configuration store keyed by algorithm id and scenario name.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    algorithms: Mutex<HashMap<String, String>>,
    scenarios: Mutex<HashMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(self, algorithm: &str, document: &str) -> Self {
        self.algorithms
            .lock()
            .unwrap()
            .insert(algorithm.to_string(), document.to_string());
        self
    }

    pub fn with_scenario(self, name: &str, document: &str) -> Self {
        self.scenarios
            .lock()
            .unwrap()
            .insert(name.to_string(), document.to_string());
        self
    }
}

impl ConfigStore for MemoryConfigStore {
    fn algorithm_config(&self, algorithm: &str) -> RemoteResult<Option<String>> {
        Ok(self.algorithms.lock().unwrap().get(algorithm).cloned())
    }

    fn scenario(&self, name: &str) -> RemoteResult<Option<String>> {
        Ok(self.scenarios.lock().unwrap().get(name).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// In-memory registry holding `(repository, tag)` pairs.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    images: Mutex<HashSet<(String, String)>>,
    failing: Mutex<HashSet<String>>,
    lookups: Mutex<usize>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_image(&self, repository: &str, tag: &str) {
        self.images
            .lock()
            .unwrap()
            .insert((repository.to_string(), tag.to_string()));
    }

    /// Every lookup against `repository` returns a transport error.
    pub fn fail_repository(&self, repository: &str) {
        self.failing.lock().unwrap().insert(repository.to_string());
    }

    pub fn lookup_count(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl ContainerRegistry for MemoryRegistry {
    async fn image_exists(&self, repository: &str, tag: &str) -> RemoteResult<bool> {
        *self.lookups.lock().unwrap() += 1;
        if self.failing.lock().unwrap().contains(repository) {
            return Err(RemoteError::Transport(format!(
                "registry unreachable for {}",
                repository
            )));
        }
        Ok(self
            .images
            .lock()
            .unwrap()
            .contains(&(repository.to_string(), tag.to_string())))
    }
}

// ---------------------------------------------------------------------------
// MemoryObjectStore
// ---------------------------------------------------------------------------

/// In-memory object store holding `(bucket, key)` pairs.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashSet<(String, String)>>,
    failing: Mutex<HashSet<String>>,
    lookups: Mutex<usize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()));
    }

    /// Every lookup of `key` (in any bucket) returns a transport error.
    pub fn fail_key(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn lookup_count(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn object_exists(&self, bucket: &str, key: &str) -> RemoteResult<bool> {
        *self.lookups.lock().unwrap() += 1;
        if self.failing.lock().unwrap().contains(key) {
            return Err(RemoteError::Transport(format!(
                "object store timed out for s3://{}/{}",
                bucket, key
            )));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .contains(&(bucket.to_string(), key.to_string())))
    }
}

// ---------------------------------------------------------------------------
// MemoryExecutionService
// ---------------------------------------------------------------------------

/// In-memory execution service.
///
/// Enforces job-name uniqueness like the real service and records every
/// create attempt, accepted or not.
#[derive(Debug, Default)]
pub struct MemoryExecutionService {
    jobs: Mutex<Vec<CreateTrainingJob>>,
    attempts: Mutex<usize>,
    unavailable: Mutex<bool>,
    unconfirmed: Mutex<bool>,
    quota: Mutex<Option<usize>>,
}

impl MemoryExecutionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails as if the endpoint were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Accept creates but answer with `RemoteError::Unconfirmed`, as if the
    /// reply was lost after the job was created.
    pub fn set_unconfirmed(&self, unconfirmed: bool) {
        *self.unconfirmed.lock().unwrap() = unconfirmed;
    }

    /// Reject creates once `limit` jobs exist.
    pub fn set_quota(&self, limit: usize) {
        *self.quota.lock().unwrap() = Some(limit);
    }

    /// Number of create calls received, including rejected ones.
    pub fn create_attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Descriptors of jobs that were actually created.
    pub fn created_jobs(&self) -> Vec<CreateTrainingJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionService for MemoryExecutionService {
    async fn create_training_job(&self, request: &CreateTrainingJob) -> RemoteResult<CreatedJob> {
        *self.attempts.lock().unwrap() += 1;

        if *self.unavailable.lock().unwrap() {
            return Err(RemoteError::Unavailable(
                "connection refused".to_string(),
            ));
        }

        let mut jobs = self.jobs.lock().unwrap();
        if jobs
            .iter()
            .any(|j| j.training_job_name == request.training_job_name)
        {
            return Err(RemoteError::Rejected {
                reason: format!(
                    "ResourceInUse: Training job names must be unique. A job named {} already exists",
                    request.training_job_name
                ),
            });
        }
        if let Some(limit) = *self.quota.lock().unwrap() {
            if jobs.len() >= limit {
                return Err(RemoteError::Rejected {
                    reason: format!("ResourceLimitExceeded: account quota of {} jobs reached", limit),
                });
            }
        }

        jobs.push(request.clone());
        if *self.unconfirmed.lock().unwrap() {
            return Err(RemoteError::Unconfirmed {
                job_name: request.training_job_name.clone(),
                reason: "200 OK with unreadable body".to_string(),
            });
        }
        Ok(CreatedJob {
            job_arn: format!(
                "arn:trainlaunch:memory:training-job/{}/{}",
                request.training_job_name,
                uuid::Uuid::new_v4()
            ),
        })
    }
}
