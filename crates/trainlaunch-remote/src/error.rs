//! Error types for trainlaunch-remote

use thiserror::Error;

/// Errors raised by remote collaborators
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Requested item does not exist
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Lookup could not be completed (connectivity, auth, unexpected status)
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side understood the request and refused it
    #[error("rejected by remote service: {reason}")]
    Rejected { reason: String },

    /// The remote side accepted a create request but its reply could not be
    /// read. The job may exist.
    #[error("{job_name} was accepted but not confirmed: {reason}")]
    Unconfirmed { job_name: String, reason: String },

    /// The remote service could not be reached or failed internally
    #[error("remote service unavailable: {0}")]
    Unavailable(String),

    /// Response or document could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Parse(err.to_string())
    }
}
