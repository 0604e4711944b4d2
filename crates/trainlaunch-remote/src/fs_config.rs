//! Configuration store backed by a local directory.
//!
//! Layout mirrors the remote configuration prefix:
//!
//! ```text
//! <root>/algorithms/<algorithm>.yaml
//! <root>/environments/scenarios/<scenario>
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::traits::ConfigStore;
use crate::RemoteResult;

/// Reads configuration documents from a directory tree.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    root: PathBuf,
}

impl FsConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn algorithm_path(&self, algorithm: &str) -> PathBuf {
        self.root
            .join("algorithms")
            .join(format!("{}.yaml", algorithm))
    }

    fn scenario_path(&self, name: &str) -> PathBuf {
        self.root.join("environments").join("scenarios").join(name)
    }
}

fn read_optional(path: &Path) -> RemoteResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), bytes = content.len(), "Loaded config document");
            Ok(Some(content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl ConfigStore for FsConfigStore {
    fn algorithm_config(&self, algorithm: &str) -> RemoteResult<Option<String>> {
        read_optional(&self.algorithm_path(algorithm))
    }

    fn scenario(&self, name: &str) -> RemoteResult<Option<String>> {
        // Names are file names, never paths.
        if name.contains('/') || name.contains("..") {
            return Ok(None);
        }
        read_optional(&self.scenario_path(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_algorithm_document() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("algorithms")).unwrap();
        std::fs::write(
            dir.path().join("algorithms/drqn.yaml"),
            "hyperparameters:\n  learning_rate: 0.0001\n",
        )
        .unwrap();

        let store = FsConfigStore::new(dir.path());
        let doc = store.algorithm_config("drqn").unwrap().unwrap();
        assert!(doc.contains("learning_rate"));
    }

    #[test]
    fn test_missing_document_is_none() {
        let dir = tempdir().unwrap();
        let store = FsConfigStore::new(dir.path());
        assert!(store.algorithm_config("ppo").unwrap().is_none());
        assert!(store.scenario("ppo_scenario.yaml").unwrap().is_none());
    }

    #[test]
    fn test_scenario_name_cannot_escape_root() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("secret.yaml"), "x: 1").unwrap();
        let store = FsConfigStore::new(dir.path().join("configs"));
        assert!(store.scenario("../../secret.yaml").unwrap().is_none());
    }
}
