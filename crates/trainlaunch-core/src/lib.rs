//! Trainlaunch Core Library
//!
//! Turns a training request into a validated, submission-ready job and
//! submits it: resolve hyperparameters, gate on artifact existence, build
//! the job spec, submit once.

pub mod builder;
pub mod domain;
pub mod metrics;
pub mod naming;
pub mod obs;
pub mod pipeline;
pub mod resolver;
pub mod settings;
pub mod submitter;
pub mod telemetry;
pub mod validator;

pub use domain::{
    Algorithm, AlgorithmFamily, ArtifactLocation, ArtifactOutcome, ArtifactReference,
    ComputeClass, ExecutionMode, HyperValue, HyperparameterEntry, HyperparameterSet, JobRequest,
    JobSpec, LaunchError, LaunchStage, MissingArtifact, NetworkMode, Override, Provenance, Result,
    ValidationResult,
};

pub use builder::{ComputePolicy, JobSpecBuilder};
pub use metrics::{definitions_for, scan_log, MetricCoverage};
pub use naming::{job_name, Clock, FixedClock, NamingPolicy, SystemClock};
pub use pipeline::{Collaborators, LaunchPipeline, LaunchPlan};
pub use resolver::ConfigResolver;
pub use settings::{EndpointSettings, LaunchSettings, NetworkSettings, SettingsFile};
pub use submitter::{JobHandle, JobSubmitter};
pub use telemetry::init_tracing;
pub use validator::{standard_references, ArtifactValidator};
