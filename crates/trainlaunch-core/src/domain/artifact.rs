//! Artifact references and their validation outcomes.

use serde::{Deserialize, Serialize};

/// Where an artifact lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "store", rename_all = "snake_case")]
pub enum ArtifactLocation {
    /// Image in a container registry
    ContainerImage { repository: String, tag: String },
    /// Object in the configuration bucket
    ConfigObject { bucket: String, key: String },
}

impl std::fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactLocation::ContainerImage { repository, tag } => {
                write!(f, "{}:{}", repository, tag)
            }
            ArtifactLocation::ConfigObject { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
        }
    }
}

/// A labelled dependency that must exist before a job may be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactReference {
    /// Human label used in error reports (e.g. "training image")
    pub label: String,
    pub location: ArtifactLocation,
}

impl ArtifactReference {
    pub fn image(label: &str, repository: &str, tag: &str) -> Self {
        Self {
            label: label.to_string(),
            location: ArtifactLocation::ContainerImage {
                repository: repository.to_string(),
                tag: tag.to_string(),
            },
        }
    }

    pub fn object(label: &str, bucket: &str, key: &str) -> Self {
        Self {
            label: label.to_string(),
            location: ArtifactLocation::ConfigObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        }
    }
}

/// Result of one existence lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Present,
    Absent,
    /// Lookup failed; existence is unknown
    Error(String),
}

impl ArtifactOutcome {
    pub fn is_present(&self) -> bool {
        matches!(self, ArtifactOutcome::Present)
    }
}

impl std::fmt::Display for ArtifactOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactOutcome::Present => f.write_str("present"),
            ArtifactOutcome::Absent => f.write_str("absent"),
            ArtifactOutcome::Error(reason) => write!(f, "lookup failed ({})", reason),
        }
    }
}

/// An artifact that could not be confirmed present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArtifact {
    pub label: String,
    pub location: String,
    pub outcome: ArtifactOutcome,
}

impl std::fmt::Display for MissingArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.label, self.location, self.outcome)
    }
}

/// One outcome per submitted reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    entries: Vec<(ArtifactReference, ArtifactOutcome)>,
}

impl ValidationResult {
    pub fn from_entries(entries: Vec<(ArtifactReference, ArtifactOutcome)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(ArtifactReference, ArtifactOutcome)] {
        &self.entries
    }

    pub fn outcome(&self, label: &str) -> Option<&ArtifactOutcome> {
        self.entries
            .iter()
            .find(|(r, _)| r.label == label)
            .map(|(_, o)| o)
    }

    pub fn all_present(&self) -> bool {
        self.entries.iter().all(|(_, o)| o.is_present())
    }

    /// Absent and errored entries, in submission order.
    pub fn missing(&self) -> Vec<MissingArtifact> {
        self.entries
            .iter()
            .filter(|(_, o)| !o.is_present())
            .map(|(r, o)| MissingArtifact {
                label: r.label.clone(),
                location: r.location.to_string(),
                outcome: o.clone(),
            })
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, ArtifactOutcome::Error(_)))
            .count()
    }
}
