//! `.code-workspace` file generation.

use std::{
    io,
    path::{Path, PathBuf},
};

use ide_bridge_core::Result;
use serde_json::json;
use tokio::fs;
use tracing::info;

use crate::tree::copy_tree;

/// Create a workspace in the directory `location`.
///
/// The directory is created (populated from `template` when given) and a
/// `<stem>.code-workspace` file is written into it, where `<stem>` is the
/// directory name up to its first `.`. The folder list always contains
/// `.`, followed by `folders` without duplicates.
///
/// Returns the path of the workspace file.
///
/// # Errors
/// Returns `BridgeError::Io` if the directory cannot be created or
/// populated, or the file cannot be written.
pub async fn create_workspace(
    location: &Path,
    folders: &[&str],
    template: Option<&Path>,
) -> Result<PathBuf> {
    match template {
        Some(template) => copy_tree(template, location).await?,
        None => fs::create_dir_all(location).await?,
    }

    let stem = location
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no usable directory name", location.display()),
            )
        })?;

    let mut paths = vec!["."];
    for &folder in folders {
        if !paths.contains(&folder) {
            paths.push(folder);
        }
    }

    let document = json!({
        "folders": paths.iter().map(|path| json!({"path": path})).collect::<Vec<_>>(),
        "settings": {
            "window.title": "${folderName}"
        }
    });

    let file = location.join(format!("{stem}.code-workspace"));
    let contents = serde_json::to_string_pretty(&document).map_err(io::Error::other)?;
    fs::write(&file, contents).await?;
    info!(path = %file.display(), folders = paths.len(), "Created workspace");
    Ok(file)
}
