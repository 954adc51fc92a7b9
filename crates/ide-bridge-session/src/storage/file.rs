//! JSON registry file shared with the editor extension.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use ide_bridge_core::{InstanceMap, InstanceStorage, StorageError};
use tracing::debug;

/// File name of the registry in the user's home directory.
pub const REGISTRY_FILE_NAME: &str = ".vscode_instances.json";

/// Registry stored as a JSON object keyed by process id.
///
/// A missing file holds no instances.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The registry every editor on this machine writes to.
    ///
    /// # Errors
    /// Returns error if the home directory cannot be determined.
    pub fn user_default() -> Result<Self, StorageError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StorageError::Internal("no home directory".to_string()))?;
        Ok(Self::new(home.join(REGISTRY_FILE_NAME)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InstanceStorage for FileStorage {
    async fn load(&self) -> Result<InstanceMap, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No registry file");
                return Ok(InstanceMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let text = String::from_utf8_lossy(&bytes);
        if text.trim().is_empty() {
            return Ok(InstanceMap::new());
        }

        serde_json::from_str(&text)
            .map_err(|e| StorageError::Malformed(format!("{}: {e}", self.path.display())))
    }

    async fn save(&self, instances: &InstanceMap) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(instances)
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        // Readers poll this file; replace it in one step.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}
