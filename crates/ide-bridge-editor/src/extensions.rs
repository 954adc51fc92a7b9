//! Installed editor extensions, as recorded in `extensions.json`.

use std::{
    io,
    path::{Path, PathBuf},
};

use ide_bridge_core::{BridgeError, Result, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;
use uuid::Uuid;

use crate::tree::copy_tree;

/// Name of the index file inside an extensions directory.
pub const EXTENSIONS_FILE: &str = "extensions.json";

/// Marketplace identity of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionIdentifier {
    /// `publisher.name`
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// One entry of `extensions.json`.
///
/// Fields this crate does not interpret (`location`, `metadata`, ...) are
/// kept as they were read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub identifier: ExtensionIdentifier,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Extension {
    /// New record with a freshly generated uuid, installed under
    /// `<id>-<version>`.
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        let id = id.into();
        let version = version.into();
        Self {
            relative_location: Some(format!("{id}-{version}")),
            identifier: ExtensionIdentifier {
                id,
                uuid: Some(Uuid::new_v4().to_string()),
            },
            version,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.identifier.id
    }

    /// Extension name: the id after the first `.`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.id().split_once('.').map_or(self.id(), |(_, name)| name)
    }

    /// Publisher: the id before the first `.`.
    #[must_use]
    pub fn publisher(&self) -> &str {
        self.id().split_once('.').map_or(self.id(), |(publisher, _)| publisher)
    }
}

/// Contents of an `extensions.json` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionList {
    extensions: Vec<Extension>,
}

impl ExtensionList {
    /// Extensions directory used by the editor for the current user.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".vscode").join("extensions"))
    }

    /// Index file used by the editor for the current user.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|dir| dir.join(EXTENSIONS_FILE))
    }

    /// Install an unpacked extension.
    ///
    /// Copies `copy_from` into `<extensions_dir>/<id>-<version>` and records
    /// the extension in `<extensions_dir>/extensions.json`, replacing any
    /// entry with the same id. A missing index file starts an empty list.
    ///
    /// # Errors
    /// Returns `BridgeError::Io` if the files cannot be copied or the index
    /// cannot be read or written, and `BridgeError::Storage` if the existing
    /// index is malformed.
    pub async fn install(
        extensions_dir: &Path,
        id: &str,
        version: &str,
        copy_from: &Path,
    ) -> Result<Extension> {
        let index = extensions_dir.join(EXTENSIONS_FILE);
        let mut list = match Self::load(&index).await {
            Ok(list) => list,
            Err(BridgeError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e),
        };

        let mut extension = Extension::new(id, version);
        let target = extensions_dir.join(format!("{id}-{version}"));
        copy_tree(copy_from, &target).await?;
        extension
            .extra
            .insert("location".to_string(), file_location(&target));

        list.add(extension.clone());
        list.save(&index).await?;
        info!(id, version, path = %target.display(), "Installed extension");
        Ok(extension)
    }

    /// Read the list from `path`.
    ///
    /// # Errors
    /// Returns `BridgeError::Io` if the file cannot be read and
    /// `BridgeError::Storage` if it is not a list of extensions.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let extensions = serde_json::from_slice(&bytes).map_err(|e| {
            BridgeError::Storage(StorageError::Malformed(format!("{}: {e}", path.display())))
        })?;
        Ok(Self { extensions })
    }

    /// Write the list to `path`.
    ///
    /// # Errors
    /// Returns `BridgeError::Io` if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(&self.extensions)
            .map_err(|e| BridgeError::Storage(StorageError::Internal(e.to_string())))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Installed extensions in file order.
    pub fn installed(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.id() == id)
    }

    /// Add `extension`, replacing any entry with the same id. The new entry
    /// goes last.
    pub fn add(&mut self, extension: Extension) {
        self.extensions.retain(|ext| ext.id() != extension.id());
        self.extensions.push(extension);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// `file:` URI record the editor stores as an extension's `location`.
fn file_location(path: &Path) -> Value {
    let fs_path = path.display().to_string();
    let mut uri_path = fs_path.replace('\\', "/");
    if !uri_path.starts_with('/') {
        uri_path.insert(0, '/');
    }
    json!({
        "$mid": 1,
        "fsPath": fs_path,
        "_sep": 1,
        "external": format!("file://{}", uri_path.replace(':', "%3A")),
        "path": uri_path,
        "scheme": "file"
    })
}
