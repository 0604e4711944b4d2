//! Job spec assembly.
//!
//! The builder is the only producer of [`JobSpec`]. It refuses to build
//! anything unless the artifact gate passed and confirmed every artifact
//! the spec will reference.

use std::collections::BTreeMap;

use serde_json::json;
use trainlaunch_remote::Tag;

use crate::domain::algorithm::{Algorithm, ComputeClass, ExecutionMode};
use crate::domain::artifact::{ArtifactOutcome, MissingArtifact, ValidationResult};
use crate::domain::digest::compute_digest;
use crate::domain::error::{LaunchError, Result};
use crate::domain::hyperparams::HyperparameterSet;
use crate::domain::job_spec::{InputChannel, JobSpec, NetworkMode, OutputPaths, StoppingLimits};
use crate::domain::request::JobRequest;
use crate::metrics;
use crate::naming::NamingPolicy;
use crate::obs;
use crate::settings::LaunchSettings;
use crate::validator::standard_references;

const HOUR_SECS: u64 = 3_600;
const INSTANCE_COUNT: u32 = 1;
const MANAGED_BY: &str = "trainlaunch";

pub const ENV_ALGORITHM: &str = "ALGORITHM";
pub const ENV_TOTAL_STEPS: &str = "TOTAL_STEPS";
pub const ENV_SCENARIO_NAME: &str = "SCENARIO_NAME";
pub const ENV_ENVIRONMENT_MODE: &str = "ENVIRONMENT_MODE";
/// Complete hyperparameter map as a JSON object, uncapped.
pub const ENV_HYPERPARAMETERS_JSON: &str = "HYPERPARAMETERS_JSON";

pub const CONFIG_CHANNEL: &str = "config";
pub const SCENARIOS_CHANNEL: &str = "scenarios";

/// Default sizing for an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputePolicy {
    pub compute_class: ComputeClass,
    pub max_runtime_secs: u64,
}

impl ComputePolicy {
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        let (compute_class, hours) = match algorithm {
            Algorithm::Drqn | Algorithm::Dqn => (ComputeClass::G4dnXlarge, 24),
            Algorithm::Ppo => (ComputeClass::G4dn2xlarge, 48),
            Algorithm::RecurrentPpo => (ComputeClass::G5Xlarge, 48),
        };
        Self {
            compute_class,
            max_runtime_secs: hours * HOUR_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobSpecBuilder {
    settings: LaunchSettings,
    naming: NamingPolicy,
}

impl JobSpecBuilder {
    pub fn new(settings: LaunchSettings, naming: NamingPolicy) -> Self {
        Self { settings, naming }
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    pub fn build(
        &self,
        request: &JobRequest,
        hyperparameters: &HyperparameterSet,
        validation: &ValidationResult,
    ) -> Result<JobSpec> {
        request.validate()?;
        let missing = self.unconfirmed(request, validation);
        if !missing.is_empty() {
            return Err(LaunchError::ValidationFailed { missing });
        }

        let settings = &self.settings;
        let algorithm = request.algorithm;
        let policy = ComputePolicy::for_algorithm(algorithm);
        let compute_class = request.compute_class.unwrap_or(policy.compute_class);
        let network = self.network_for(request.execution_mode)?;

        let scenario = request.scenario_name();
        let job_name = self.naming.next_name(algorithm, &scenario, request.seed);
        let image_tag = request.image_tag.as_deref().unwrap_or(&settings.image_tag);
        let image_uri = settings.image_uri(image_tag);

        let transport = hyperparameters.to_transport_map();
        let limit = settings.hyperparameter_display_limit;
        let visible: Vec<(String, String)> = transport.iter().take(limit).cloned().collect();
        let overflow: Vec<String> = transport.iter().skip(limit).map(|(k, _)| k.clone()).collect();

        let full_map: serde_json::Map<String, serde_json::Value> = transport
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        let mut environment = BTreeMap::new();
        environment.insert(ENV_ALGORITHM.to_string(), algorithm.id().to_string());
        environment.insert(ENV_TOTAL_STEPS.to_string(), request.total_steps.to_string());
        environment.insert(ENV_SCENARIO_NAME.to_string(), scenario.clone());
        environment.insert(
            ENV_ENVIRONMENT_MODE.to_string(),
            request.execution_mode.container_value().to_string(),
        );
        environment.insert(
            ENV_HYPERPARAMETERS_JSON.to_string(),
            serde_json::to_string(&full_map)?,
        );

        let stopping = StoppingLimits {
            max_runtime_secs: policy.max_runtime_secs,
            max_wait_secs: request
                .spot
                .then(|| settings.spot_max_wait_secs.max(policy.max_runtime_secs)),
        };
        let metric_definitions = metrics::definitions_for(algorithm);

        let spec_digest = compute_digest(&json!({
            "algorithm": algorithm,
            "scenario": scenario,
            "execution_mode": request.execution_mode,
            "image_uri": image_uri,
            "role_arn": settings.role_arn,
            "instance_type": compute_class.instance_type(),
            "instance_count": INSTANCE_COUNT,
            "volume_size_gb": settings.volume_size_gb,
            "network": network,
            "environment": environment,
            "hyperparameters": full_map,
            "metrics": metric_definitions,
            "stopping": stopping,
            "spot": request.spot,
        }))?;

        let tags = vec![
            Tag::new("Algorithm", algorithm.id()),
            Tag::new("Project", &settings.project),
            Tag::new("ManagedBy", MANAGED_BY),
            Tag::new("SpecDigest", &spec_digest),
        ];

        let spec = JobSpec {
            outputs: OutputPaths::new(&settings.bucket, algorithm, &job_name),
            inputs: vec![
                InputChannel {
                    name: CONFIG_CHANNEL.to_string(),
                    prefix: settings.algorithms_prefix(),
                },
                InputChannel {
                    name: SCENARIOS_CHANNEL.to_string(),
                    prefix: settings.scenarios_prefix(),
                },
            ],
            job_name,
            algorithm,
            scenario,
            execution_mode: request.execution_mode,
            image_uri,
            role_arn: settings.role_arn.clone(),
            compute_class,
            instance_count: INSTANCE_COUNT,
            volume_size_gb: settings.volume_size_gb,
            network,
            environment,
            hyperparameters: visible,
            overflow_hyperparameters: overflow,
            metrics: metric_definitions,
            stopping,
            spot: request.spot,
            tags,
            spec_digest,
        };

        if !spec.overflow_hyperparameters.is_empty() {
            obs::emit_hyperparameter_overflow(&spec.job_name, limit, &spec.overflow_hyperparameters);
        }
        obs::emit_metric_patterns(&spec.job_name, spec.metrics.len());
        obs::emit_spec_built(
            &spec.job_name,
            spec.compute_class.instance_type(),
            spec.spot,
            &spec.spec_digest,
        );
        Ok(spec)
    }

    /// Failed entries of `validation`, plus every artifact this request
    /// depends on that `validation` does not show as present.
    fn unconfirmed(
        &self,
        request: &JobRequest,
        validation: &ValidationResult,
    ) -> Vec<MissingArtifact> {
        let mut missing = validation.missing();
        for required in standard_references(&self.settings, request) {
            let location = required.location.to_string();
            let confirmed = validation
                .entries()
                .iter()
                .any(|(r, o)| r.location == required.location && o.is_present());
            if !confirmed && !missing.iter().any(|m| m.location == location) {
                missing.push(MissingArtifact {
                    label: required.label,
                    location,
                    outcome: ArtifactOutcome::Error("not checked".to_string()),
                });
            }
        }
        missing
    }

    fn network_for(&self, mode: ExecutionMode) -> Result<NetworkMode> {
        match mode {
            ExecutionMode::Simulation => Ok(NetworkMode::Default),
            ExecutionMode::Emulation => {
                let network = self.settings.network.as_ref().ok_or_else(|| {
                    LaunchError::Settings(
                        "emulation mode requires [network] subnets and security_group_ids"
                            .to_string(),
                    )
                })?;
                if network.subnets.is_empty() || network.security_group_ids.is_empty() {
                    return Err(LaunchError::Settings(
                        "emulation mode requires at least one subnet and one security group"
                            .to_string(),
                    ));
                }
                Ok(NetworkMode::Isolated {
                    subnets: network.subnets.clone(),
                    security_group_ids: network.security_group_ids.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::domain::artifact::{ArtifactOutcome, ArtifactReference};
    use crate::domain::hyperparams::{HyperValue, Provenance};
    use crate::naming::FixedClock;
    use crate::settings::NetworkSettings;

    fn builder(settings: LaunchSettings) -> JobSpecBuilder {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        JobSpecBuilder::new(settings, NamingPolicy::new(Arc::new(clock)))
    }

    fn settings() -> LaunchSettings {
        LaunchSettings::new("artifacts", "registry.local/rl/training", "arn:role/training")
    }

    /// Every standard reference of a default-tag request, present.
    fn passed() -> ValidationResult {
        let req = JobRequest::new(Algorithm::Drqn, 10);
        let mut entries = Vec::new();
        for alg in Algorithm::ALL {
            let req = JobRequest { algorithm: alg, ..req.clone() };
            for r in standard_references(&settings(), &req) {
                entries.push((r, ArtifactOutcome::Present));
            }
        }
        entries.push((
            ArtifactReference::object(
                "scenario",
                "artifacts",
                "configs/environments/scenarios/maze.yaml",
            ),
            ArtifactOutcome::Present,
        ));
        ValidationResult::from_entries(entries)
    }

    fn hyperparameters(n: usize) -> HyperparameterSet {
        let mut set = HyperparameterSet::new();
        set.insert("algorithm", HyperValue::Str("ppo".into()), Provenance::Default);
        for i in 1..n {
            set.insert(&format!("hp_{:02}", i), HyperValue::Int(i as i64), Provenance::File);
        }
        set
    }

    #[test]
    fn test_failed_validation_blocks_build() {
        let req = JobRequest::new(Algorithm::Ppo, 10);
        let mut refs = standard_references(&settings(), &req).into_iter();
        let validation = ValidationResult::from_entries(vec![
            (refs.next().unwrap(), ArtifactOutcome::Absent),
            (refs.next().unwrap(), ArtifactOutcome::Present),
            (refs.next().unwrap(), ArtifactOutcome::Error("timeout".into())),
        ]);
        let err = builder(settings())
            .build(&req, &hyperparameters(1), &validation)
            .unwrap_err();
        assert_eq!(err.missing_labels(), vec!["training image", "scenario"]);
    }

    #[test]
    fn test_unchecked_artifacts_block_build() {
        let req = JobRequest::new(Algorithm::Ppo, 10);
        let err = builder(settings())
            .build(&req, &hyperparameters(1), &ValidationResult::default())
            .unwrap_err();
        assert_eq!(
            err.missing_labels(),
            vec!["training image", "algorithm config", "scenario"]
        );
    }

    #[test]
    fn test_validation_of_other_artifacts_does_not_count() {
        // Image confirmed under a different tag than the one the job will run.
        let req = JobRequest::new(Algorithm::Ppo, 10);
        let mut entries: Vec<_> = standard_references(&settings(), &req)
            .into_iter()
            .skip(1)
            .map(|r| (r, ArtifactOutcome::Present))
            .collect();
        entries.push((
            ArtifactReference::image("training image", "registry.local/rl/training", "v2"),
            ArtifactOutcome::Present,
        ));
        let err = builder(settings())
            .build(&req, &hyperparameters(1), &ValidationResult::from_entries(entries))
            .unwrap_err();
        match err {
            LaunchError::ValidationFailed { missing } => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].location, "registry.local/rl/training:latest");
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_request_owned_override_rejected_at_build() {
        let req = JobRequest::new(Algorithm::Drqn, 10).with_override("total_steps=99");
        let err = builder(settings())
            .build(&req, &hyperparameters(1), &passed())
            .unwrap_err();
        assert!(matches!(err, LaunchError::InvalidOverride { .. }));
    }

    #[test]
    fn test_compute_policy_table() {
        let cases = [
            (Algorithm::Drqn, "ml.g4dn.xlarge", 86_400),
            (Algorithm::Dqn, "ml.g4dn.xlarge", 86_400),
            (Algorithm::Ppo, "ml.g4dn.2xlarge", 172_800),
            (Algorithm::RecurrentPpo, "ml.g5.xlarge", 172_800),
        ];
        for (alg, instance, runtime) in cases {
            let spec = builder(settings())
                .build(&JobRequest::new(alg, 10), &hyperparameters(1), &passed())
                .unwrap();
            assert_eq!(spec.compute_class.instance_type(), instance);
            assert_eq!(spec.stopping.max_runtime_secs, runtime);
        }
    }

    #[test]
    fn test_explicit_compute_class_wins() {
        let req = JobRequest::new(Algorithm::Dqn, 10).with_compute_class(ComputeClass::G5Xlarge);
        let spec = builder(settings())
            .build(&req, &hyperparameters(1), &passed())
            .unwrap();
        assert_eq!(spec.compute_class, ComputeClass::G5Xlarge);
        assert_eq!(spec.stopping.max_runtime_secs, 86_400);
    }

    #[test]
    fn test_display_cap_and_overflow() {
        let spec = builder(settings())
            .build(&JobRequest::new(Algorithm::Ppo, 10), &hyperparameters(20), &passed())
            .unwrap();

        assert_eq!(spec.hyperparameters.len(), 16);
        assert_eq!(spec.hyperparameters[0].0, "algorithm");
        assert_eq!(
            spec.overflow_hyperparameters,
            vec!["hp_16", "hp_17", "hp_18", "hp_19"]
        );

        let full: serde_json::Value =
            serde_json::from_str(&spec.environment[ENV_HYPERPARAMETERS_JSON]).unwrap();
        assert_eq!(full.as_object().unwrap().len(), 20);
        assert_eq!(full["hp_19"], "19");
    }

    #[test]
    fn test_environment_metadata() {
        let req = JobRequest::new(Algorithm::Drqn, 500_000)
            .with_scenario("maze.yaml")
            .with_mode(ExecutionMode::Emulation);
        let s = settings().with_network(NetworkSettings {
            subnets: vec!["subnet-a".into()],
            security_group_ids: vec!["sg-1".into()],
        });
        let spec = builder(s).build(&req, &hyperparameters(1), &passed()).unwrap();

        assert_eq!(spec.environment[ENV_ALGORITHM], "drqn");
        assert_eq!(spec.environment[ENV_TOTAL_STEPS], "500000");
        assert_eq!(spec.environment[ENV_SCENARIO_NAME], "maze.yaml");
        assert_eq!(spec.environment[ENV_ENVIRONMENT_MODE], "aws");
        assert!(matches!(spec.network, NetworkMode::Isolated { .. }));
        assert!(spec.to_descriptor().vpc_config.is_some());
    }

    #[test]
    fn test_emulation_without_network_rejected() {
        let req = JobRequest::new(Algorithm::Drqn, 10).with_mode(ExecutionMode::Emulation);
        let err = builder(settings())
            .build(&req, &hyperparameters(1), &passed())
            .unwrap_err();
        assert!(matches!(err, LaunchError::Settings(_)));
    }

    #[test]
    fn test_spot_wait_and_on_demand() {
        let spec = builder(settings())
            .build(&JobRequest::new(Algorithm::Drqn, 10), &hyperparameters(1), &passed())
            .unwrap();
        assert!(spec.spot);
        assert_eq!(spec.stopping.max_wait_secs, Some(172_800));

        let mut s = settings();
        s.spot_max_wait_secs = 3_600;
        let spec = builder(s)
            .build(&JobRequest::new(Algorithm::Ppo, 10), &hyperparameters(1), &passed())
            .unwrap();
        assert_eq!(spec.stopping.max_wait_secs, Some(172_800));

        let spec = builder(settings())
            .build(
                &JobRequest::new(Algorithm::Drqn, 10).without_spot(),
                &hyperparameters(1),
                &passed(),
            )
            .unwrap();
        assert!(!spec.spot);
        assert_eq!(spec.stopping.max_wait_secs, None);
    }

    #[test]
    fn test_paths_tags_and_inputs() {
        let spec = builder(settings())
            .build(&JobRequest::new(Algorithm::Drqn, 10), &hyperparameters(1), &passed())
            .unwrap();
        assert_eq!(spec.job_name, "drqn-drqn-scenario-20250102-030405");
        assert_eq!(
            spec.outputs.checkpoint_prefix,
            "checkpoints/drqn/drqn-drqn-scenario-20250102-030405/"
        );
        assert_eq!(spec.inputs[0].prefix, "configs/algorithms/");
        assert_eq!(spec.inputs[1].prefix, "configs/environments/scenarios/");

        let tag = |k: &str| spec.tags.iter().find(|t| t.key == k).map(|t| t.value.clone());
        assert_eq!(tag("Algorithm").as_deref(), Some("drqn"));
        assert_eq!(tag("ManagedBy").as_deref(), Some("trainlaunch"));
        assert_eq!(tag("SpecDigest"), Some(spec.spec_digest.clone()));
        assert_eq!(spec.metrics.len(), 7);
    }

    #[test]
    fn test_digest_ignores_job_name() {
        let req = JobRequest::new(Algorithm::Ppo, 10);
        let a = builder(settings()).build(&req, &hyperparameters(3), &passed()).unwrap();

        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()));
        let later = JobSpecBuilder::new(settings(), NamingPolicy::new(clock));
        let b = later.build(&req, &hyperparameters(3), &passed()).unwrap();

        assert_ne!(a.job_name, b.job_name);
        assert_eq!(a.spec_digest, b.spec_digest);

        let c = builder(settings())
            .build(&JobRequest::new(Algorithm::Ppo, 20), &hyperparameters(3), &passed())
            .unwrap();
        assert_ne!(a.spec_digest, c.spec_digest);
    }
}
