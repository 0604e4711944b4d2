//! Artifact gate: every dependency must exist before a job is built.
//!
//! Lookups run concurrently and never short-circuit, so one report names
//! every missing artifact. A failed lookup is recorded against its own
//! reference and does not disturb the others.

use std::sync::Arc;

use futures::future;
use trainlaunch_remote::{ContainerRegistry, ObjectStore};

use crate::domain::artifact::{
    ArtifactLocation, ArtifactOutcome, ArtifactReference, ValidationResult,
};
use crate::domain::request::JobRequest;
use crate::obs;
use crate::settings::LaunchSettings;

pub const TRAINING_IMAGE_LABEL: &str = "training image";
pub const ALGORITHM_CONFIG_LABEL: &str = "algorithm config";
pub const SCENARIO_LABEL: &str = "scenario";

/// The dependencies every launch checks: training image, the algorithm's
/// uploaded config and the scenario definition.
pub fn standard_references(
    settings: &LaunchSettings,
    request: &JobRequest,
) -> Vec<ArtifactReference> {
    let tag = request.image_tag.as_deref().unwrap_or(&settings.image_tag);
    vec![
        ArtifactReference::image(TRAINING_IMAGE_LABEL, &settings.training_repository, tag),
        ArtifactReference::object(
            ALGORITHM_CONFIG_LABEL,
            &settings.bucket,
            &settings.algorithm_config_key(request.algorithm),
        ),
        ArtifactReference::object(
            SCENARIO_LABEL,
            &settings.bucket,
            &settings.scenario_key(&request.scenario_name()),
        ),
    ]
}

#[derive(Clone)]
pub struct ArtifactValidator {
    registry: Arc<dyn ContainerRegistry>,
    objects: Arc<dyn ObjectStore>,
}

impl ArtifactValidator {
    pub fn new(registry: Arc<dyn ContainerRegistry>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { registry, objects }
    }

    /// One outcome per reference, in input order.
    pub async fn validate(&self, references: &[ArtifactReference]) -> ValidationResult {
        let lookups = references.iter().map(|r| self.check(r));
        let outcomes = future::join_all(lookups).await;

        let entries: Vec<_> = references.iter().cloned().zip(outcomes).collect();
        for (reference, outcome) in &entries {
            obs::emit_artifact_checked(
                &reference.label,
                &reference.location.to_string(),
                &outcome.to_string(),
            );
        }
        let result = ValidationResult::from_entries(entries);
        obs::emit_validation_finished(
            result.len(),
            result.missing().len(),
            result.all_present(),
        );
        result
    }

    async fn check(&self, reference: &ArtifactReference) -> ArtifactOutcome {
        let found = match &reference.location {
            ArtifactLocation::ContainerImage { repository, tag } => {
                self.registry.image_exists(repository, tag).await
            }
            ArtifactLocation::ConfigObject { bucket, key } => {
                self.objects.object_exists(bucket, key).await
            }
        };
        match found {
            Ok(true) => ArtifactOutcome::Present,
            Ok(false) => ArtifactOutcome::Absent,
            Err(e) => ArtifactOutcome::Error(e.to_string()),
        }
    }
}

impl std::fmt::Debug for ArtifactValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactValidator").finish_non_exhaustive()
    }
}
