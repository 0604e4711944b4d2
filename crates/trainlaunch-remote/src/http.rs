//! HTTP clients for the remote collaborators
//!
//! - `HttpRegistry` speaks the OCI distribution API (`HEAD /v2/<name>/manifests/<tag>`).
//! - `HttpObjectStore` issues path-style `HEAD <endpoint>/<bucket>/<key>`.
//! - `HttpExecutionService` POSTs the job descriptor as JSON.
//!
//! Request signing is not done here. Endpoints are expected to be reachable with
//! an optional bearer token (gateway, presigning proxy, local emulator).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::traits::{ContainerRegistry, ExecutionService, ObjectStore};
use crate::wire::{CreateTrainingJob, CreatedJob};
use crate::RemoteResult;

const USER_AGENT: &str = concat!("trainlaunch/", env!("CARGO_PKG_VERSION"));

const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.index.v1+json, \
application/vnd.oci.image.manifest.v1+json, \
application/vnd.docker.distribution.manifest.v2+json, \
application/vnd.docker.distribution.manifest.list.v2+json";

/// Endpoint configuration shared by the HTTP clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEndpoint {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Bearer token (optional for open endpoints)
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl RemoteEndpoint {
    pub fn new(base_url: &str) -> Self {
        RemoteEndpoint {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// `segments` appended to the base URL, each one percent-encoded, so a
    /// `#` or `?` in an object key stays part of the key.
    fn segment_url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> RemoteResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            RemoteError::Transport(format!("invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                RemoteError::Transport(format!("base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn client(&self) -> RemoteResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {}", e)))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Strip a registry host from a repository reference.
///
/// `123.dkr.ecr.us-east-1.amazonaws.com/team/training` → `team/training`.
/// A first segment counts as a host when it contains `.` or `:` or is `localhost`.
pub fn repository_path(repository: &str) -> &str {
    match repository.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            rest
        }
        _ => repository,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// OCI distribution registry client
pub struct HttpRegistry {
    endpoint: RemoteEndpoint,
    http: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(endpoint: RemoteEndpoint) -> RemoteResult<Self> {
        let http = endpoint.client()?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl ContainerRegistry for HttpRegistry {
    async fn image_exists(&self, repository: &str, tag: &str) -> RemoteResult<bool> {
        let segments = std::iter::once("v2")
            .chain(repository_path(repository).split('/'))
            .chain(["manifests", tag]);
        let url = self.endpoint.segment_url(segments)?;
        debug!(url = %url, "Registry manifest lookup");

        let response = self
            .endpoint
            .authorize(self.http.head(url).header("Accept", MANIFEST_ACCEPT))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(RemoteError::Transport(format!(
                "registry returned {} for {}:{}",
                other, repository, tag
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

/// Path-style object store client
pub struct HttpObjectStore {
    endpoint: RemoteEndpoint,
    http: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: RemoteEndpoint) -> RemoteResult<Self> {
        let http = endpoint.client()?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn object_exists(&self, bucket: &str, key: &str) -> RemoteResult<bool> {
        let url = self
            .endpoint
            .segment_url(std::iter::once(bucket).chain(key.split('/')))?;
        debug!(url = %url, "Object existence lookup");

        let response = self.endpoint.authorize(self.http.head(url)).send().await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(RemoteError::Transport(format!(
                "object store returned {} for s3://{}/{}",
                other, bucket, key
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution service
// ---------------------------------------------------------------------------

/// Execution service client
pub struct HttpExecutionService {
    endpoint: RemoteEndpoint,
    http: reqwest::Client,
}

impl HttpExecutionService {
    pub fn new(endpoint: RemoteEndpoint) -> RemoteResult<Self> {
        let http = endpoint.client()?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl ExecutionService for HttpExecutionService {
    async fn create_training_job(&self, request: &CreateTrainingJob) -> RemoteResult<CreatedJob> {
        let url = self.endpoint.segment_url(["training-jobs"])?;

        let response = self
            .endpoint
            .authorize(self.http.post(url).json(request))
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            // The job exists from here on, whatever the body says.
            let unconfirmed = |reason: String| RemoteError::Unconfirmed {
                job_name: request.training_job_name.clone(),
                reason,
            };
            let body = response
                .text()
                .await
                .map_err(|e| unconfirmed(e.to_string()))?;
            return serde_json::from_str::<CreatedJob>(&body).map_err(|e| {
                warn!(status = %status, error = %e, "Unreadable create response");
                unconfirmed(format!("{} with unreadable body: {}", status, e))
            });
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(RemoteError::Rejected {
                reason: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            })
        } else {
            warn!(status = %status, "Execution service failed");
            Err(RemoteError::Unavailable(format!("{}: {}", status, body)))
        }
    }
}
