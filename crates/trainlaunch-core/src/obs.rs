//! Structured lifecycle events for a launch.
//!
//! Every event carries an `event = "launch.*"` field so log pipelines can
//! filter on it; job-scoped events also carry `job_name`.

use tracing::{info, warn};

use crate::domain::error::LaunchStage;

/// Span tagging everything logged during one launch with its request.
///
/// Attach with `tracing::Instrument`; launches hold it across awaits.
pub fn launch_span(algorithm: &str, scenario: &str) -> tracing::Span {
    tracing::info_span!("trainlaunch.launch", algorithm = %algorithm, scenario = %scenario)
}

pub fn emit_stage_started(stage: LaunchStage) {
    info!(event = "launch.stage_started", stage = %stage);
}

pub fn emit_stage_finished(stage: LaunchStage, duration_ms: u64) {
    info!(event = "launch.stage_finished", stage = %stage, duration_ms = duration_ms);
}

pub fn emit_stage_failed(stage: LaunchStage, error: &dyn std::fmt::Display) {
    warn!(event = "launch.stage_failed", stage = %stage, error = %error);
}

/// Emit event: hyperparameters resolved, with per-layer counts.
pub fn emit_resolved(total: usize, from_file: usize, overridden: usize) {
    info!(
        event = "launch.resolved",
        total = total,
        from_file = from_file,
        overridden = overridden,
    );
}

/// A config document tried to set a key the request owns.
pub fn emit_request_owned_key_ignored(document: &str, key: &str) {
    warn!(
        event = "launch.request_owned_key_ignored",
        document = %document,
        key = %key,
    );
}

/// Emit event: one artifact lookup completed.
pub fn emit_artifact_checked(label: &str, location: &str, outcome: &str) {
    info!(
        event = "launch.artifact_checked",
        label = %label,
        location = %location,
        outcome = %outcome,
    );
}

/// Emit event: artifact gate verdict.
pub fn emit_validation_finished(checked: usize, missing: usize, passed: bool) {
    info!(
        event = "launch.validated",
        checked = checked,
        missing = missing,
        passed = passed,
    );
}

/// Hyperparameters beyond the display cap. Delivered only through the environment.
pub fn emit_hyperparameter_overflow(job_name: &str, limit: usize, overflow: &[String]) {
    warn!(
        event = "launch.hyperparameter_overflow",
        job_name = %job_name,
        limit = limit,
        overflow = %overflow.join(","),
    );
}

/// Metric patterns that do not match the job's log lines yield empty
/// history without any error from the execution service.
pub fn emit_metric_patterns(job_name: &str, count: usize) {
    info!(
        event = "launch.metric_patterns",
        job_name = %job_name,
        count = count,
        note = "non-matching log lines produce empty metric history; verify with `trainlaunch metrics check`",
    );
}

pub fn emit_spec_built(job_name: &str, instance_type: &str, spot: bool, spec_digest: &str) {
    info!(
        event = "launch.spec_built",
        job_name = %job_name,
        instance_type = %instance_type,
        spot = spot,
        spec_digest = %spec_digest,
    );
}

pub fn emit_submitted(job_name: &str, job_id: &str) {
    info!(event = "launch.submitted", job_name = %job_name, job_id = %job_id);
}
