//! Job submission.
//!
//! One create call per spec. Rejections and transport failures are reported
//! as-is; re-submitting is the caller's decision.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainlaunch_remote::{ExecutionService, RemoteError};

use crate::domain::error::{LaunchError, Result};
use crate::domain::job_spec::JobSpec;
use crate::naming::{Clock, SystemClock};
use crate::obs;
use crate::settings::LaunchSettings;

/// A submitted job, where to watch it and where its outputs land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_name: String,
    /// Identifier assigned by the execution service
    pub job_id: String,
    pub console_url: String,
    pub logs_url: String,
    /// Trained model artifacts, `s3://<bucket>/models/<alg>/<job>/`
    pub model_uri: String,
    pub checkpoint_uri: String,
    pub tensorboard_uri: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct JobSubmitter {
    service: Arc<dyn ExecutionService>,
    settings: LaunchSettings,
    clock: Arc<dyn Clock>,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn ExecutionService>, settings: LaunchSettings) -> Self {
        Self {
            service,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        let descriptor = spec.to_descriptor();
        let created = self
            .service
            .create_training_job(&descriptor)
            .await
            .map_err(|e| match e {
                RemoteError::Rejected { reason } => LaunchError::SubmissionRejected { reason },
                RemoteError::Unconfirmed { job_name, reason } => {
                    LaunchError::SubmissionUnconfirmed { job_name, reason }
                }
                other => LaunchError::SubmissionUnavailable(other.to_string()),
            })?;

        obs::emit_submitted(&spec.job_name, &created.job_arn);
        let outputs = &spec.outputs;
        Ok(JobHandle {
            job_name: spec.job_name.clone(),
            job_id: created.job_arn,
            console_url: self.settings.console_url(&spec.job_name),
            logs_url: self.settings.log_url(&spec.job_name),
            model_uri: outputs.uri(&outputs.model_prefix),
            checkpoint_uri: outputs.uri(&outputs.checkpoint_prefix),
            tensorboard_uri: outputs.uri(&outputs.tensorboard_prefix),
            created_at: self.clock.now(),
        })
    }
}

impl std::fmt::Debug for JobSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSubmitter")
            .field("region", &self.settings.region)
            .finish_non_exhaustive()
    }
}
