//! Domain models for trainlaunch.
//!
//! Canonical definitions for the core entities:
//! - `JobRequest`: what the caller asked for
//! - `HyperparameterSet`: resolved, provenance-tagged hyperparameters
//! - `ArtifactReference` / `ValidationResult`: dependency existence
//! - `JobSpec`: the submission-ready descriptor

pub mod algorithm;
pub mod artifact;
pub mod digest;
pub mod error;
pub mod hyperparams;
pub mod job_spec;
pub mod request;

// Re-export main types and errors
pub use algorithm::{Algorithm, AlgorithmFamily, ComputeClass, ExecutionMode};
pub use artifact::{
    ArtifactLocation, ArtifactOutcome, ArtifactReference, MissingArtifact, ValidationResult,
};
pub use error::{LaunchError, LaunchStage, Result};
pub use hyperparams::{HyperValue, HyperparameterEntry, HyperparameterSet, Provenance};
pub use job_spec::{InputChannel, JobSpec, NetworkMode, OutputPaths, StoppingLimits};
pub use request::{JobRequest, Override, REQUEST_OWNED_KEYS};
