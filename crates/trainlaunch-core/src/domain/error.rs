//! Domain-level error taxonomy for trainlaunch.

use crate::domain::artifact::MissingArtifact;

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Settings,
    Request,
    Resolve,
    Validate,
    Build,
    Submit,
}

impl LaunchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchStage::Settings => "settings",
            LaunchStage::Request => "request",
            LaunchStage::Resolve => "resolve",
            LaunchStage::Validate => "validate",
            LaunchStage::Build => "build",
            LaunchStage::Submit => "submit",
        }
    }
}

impl std::fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Launch errors. Every variant is fatal for the launch that produced it.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no base config found for algorithm '{algorithm}'")]
    ConfigNotFound { algorithm: String },

    #[error("invalid config document {document}: {reason}")]
    InvalidConfig { document: String, reason: String },

    #[error("invalid override '{raw}': {reason}")]
    InvalidOverride { raw: String, reason: String },

    #[error(
        "artifact validation failed, {} dependency(ies) not confirmed: {}",
        .missing.len(),
        join_missing(.missing)
    )]
    ValidationFailed { missing: Vec<MissingArtifact> },

    #[error("submission rejected by execution service: {reason}")]
    SubmissionRejected { reason: String },

    #[error("execution service unavailable: {0}")]
    SubmissionUnavailable(String),

    #[error(
        "job '{job_name}' may have been created but was not confirmed ({reason}); \
         check the console before resubmitting"
    )]
    SubmissionUnconfirmed { job_name: String, reason: String },

    #[error("config store error: {0}")]
    ConfigStore(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn join_missing(missing: &[MissingArtifact]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LaunchError {
    /// The stage that failed.
    pub fn stage(&self) -> LaunchStage {
        match self {
            LaunchError::Settings(_) => LaunchStage::Settings,
            LaunchError::InvalidRequest(_) | LaunchError::InvalidOverride { .. } => {
                LaunchStage::Request
            }
            LaunchError::ConfigNotFound { .. }
            | LaunchError::InvalidConfig { .. }
            | LaunchError::ConfigStore(_) => LaunchStage::Resolve,
            LaunchError::ValidationFailed { .. } => LaunchStage::Validate,
            LaunchError::Serialization(_) => LaunchStage::Build,
            LaunchError::SubmissionRejected { .. }
            | LaunchError::SubmissionUnavailable(_)
            | LaunchError::SubmissionUnconfirmed { .. } => LaunchStage::Submit,
        }
    }

    /// Labels of unconfirmed artifacts, empty for other variants.
    pub fn missing_labels(&self) -> Vec<&str> {
        match self {
            LaunchError::ValidationFailed { missing } => {
                missing.iter().map(|m| m.label.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl From<trainlaunch_remote::RemoteError> for LaunchError {
    fn from(err: trainlaunch_remote::RemoteError) -> Self {
        LaunchError::ConfigStore(err.to_string())
    }
}

/// Result type for trainlaunch domain operations.
pub type Result<T> = std::result::Result<T, LaunchError>;
