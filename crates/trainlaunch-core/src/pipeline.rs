//! Launch orchestration.
//!
//! Stages run strictly in order: request checks, resolve, validate, build,
//! submit. Any failure stops the launch, and nothing before submit touches
//! remote state.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;
use trainlaunch_remote::{ConfigStore, ContainerRegistry, ExecutionService, ObjectStore};

use crate::builder::JobSpecBuilder;
use crate::domain::artifact::ValidationResult;
use crate::domain::error::{LaunchError, LaunchStage, Result};
use crate::domain::hyperparams::HyperparameterSet;
use crate::domain::job_spec::JobSpec;
use crate::domain::request::JobRequest;
use crate::naming::NamingPolicy;
use crate::obs;
use crate::resolver::ConfigResolver;
use crate::settings::LaunchSettings;
use crate::submitter::{JobHandle, JobSubmitter};
use crate::validator::{standard_references, ArtifactValidator};

/// Every remote dependency of a launch.
#[derive(Clone)]
pub struct Collaborators {
    pub config_store: Arc<dyn ConfigStore>,
    pub registry: Arc<dyn ContainerRegistry>,
    pub object_store: Arc<dyn ObjectStore>,
    pub execution: Arc<dyn ExecutionService>,
}

/// Everything decided before submission. Printed by `--dry-run`.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    pub hyperparameters: HyperparameterSet,
    pub validation: ValidationResult,
    pub spec: JobSpec,
}

#[derive(Debug, Clone)]
pub struct LaunchPipeline {
    settings: LaunchSettings,
    resolver: ConfigResolver,
    validator: ArtifactValidator,
    builder: JobSpecBuilder,
    submitter: JobSubmitter,
}

impl LaunchPipeline {
    pub fn new(settings: LaunchSettings, collaborators: Collaborators, naming: NamingPolicy) -> Self {
        Self {
            resolver: ConfigResolver::new(collaborators.config_store),
            validator: ArtifactValidator::new(collaborators.registry, collaborators.object_store),
            builder: JobSpecBuilder::new(settings.clone(), naming),
            submitter: JobSubmitter::new(collaborators.execution, settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    /// Run the artifact gate alone.
    pub async fn check(&self, request: &JobRequest) -> Result<ValidationResult> {
        async {
            run_stage(LaunchStage::Request, || request.validate())?;
            Ok::<_, LaunchError>(self.validate_stage(request).await)
        }
        .instrument(span_for(request))
        .await
    }

    /// Resolve, validate and build without submitting.
    pub async fn plan(&self, request: &JobRequest) -> Result<LaunchPlan> {
        self.plan_inner(request)
            .instrument(span_for(request))
            .await
    }

    /// Plan, then submit exactly once.
    pub async fn launch(&self, request: &JobRequest) -> Result<JobHandle> {
        self.launch_inner(request)
            .instrument(span_for(request))
            .await
    }

    async fn launch_inner(&self, request: &JobRequest) -> Result<JobHandle> {
        let plan = self.plan_inner(request).await?;

        obs::emit_stage_started(LaunchStage::Submit);
        let started = Instant::now();
        match self.submitter.submit(&plan.spec).await {
            Ok(handle) => {
                obs::emit_stage_finished(LaunchStage::Submit, elapsed_ms(started));
                Ok(handle)
            }
            Err(e) => {
                obs::emit_stage_failed(LaunchStage::Submit, &e);
                Err(e)
            }
        }
    }

    async fn plan_inner(&self, request: &JobRequest) -> Result<LaunchPlan> {
        run_stage(LaunchStage::Request, || request.validate())?;
        let hyperparameters = run_stage(LaunchStage::Resolve, || self.resolver.resolve(request))?;

        let validation = self.validate_stage(request).await;
        if !validation.all_present() {
            let err = LaunchError::ValidationFailed {
                missing: validation.missing(),
            };
            obs::emit_stage_failed(LaunchStage::Validate, &err);
            return Err(err);
        }

        let spec = run_stage(LaunchStage::Build, || {
            self.builder.build(request, &hyperparameters, &validation)
        })?;

        Ok(LaunchPlan {
            hyperparameters,
            validation,
            spec,
        })
    }

    async fn validate_stage(&self, request: &JobRequest) -> ValidationResult {
        obs::emit_stage_started(LaunchStage::Validate);
        let started = Instant::now();
        let references = standard_references(&self.settings, request);
        let result = self.validator.validate(&references).await;
        obs::emit_stage_finished(LaunchStage::Validate, elapsed_ms(started));
        result
    }
}

fn span_for(request: &JobRequest) -> tracing::Span {
    obs::launch_span(request.algorithm.id(), &request.scenario_name())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn run_stage<T>(stage: LaunchStage, f: impl FnOnce() -> Result<T>) -> Result<T> {
    obs::emit_stage_started(stage);
    let started = Instant::now();
    match f() {
        Ok(v) => {
            obs::emit_stage_finished(stage, elapsed_ms(started));
            Ok(v)
        }
        Err(e) => {
            obs::emit_stage_failed(stage, &e);
            Err(e)
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
