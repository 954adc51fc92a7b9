//! Directory copying shared by workspace creation and extension installs.

use std::{io, path::Path};

use tokio::fs;

/// Copy the contents of `from` into `to`, creating `to` and any missing
/// subdirectories. Existing files in `to` are overwritten.
pub(crate) async fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((source, target)) = pending.pop() {
        fs::create_dir_all(&target).await?;
        let mut entries = fs::read_dir(&source).await?;
        while let Some(entry) = entries.next_entry().await? {
            let dest = target.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), dest));
            } else {
                fs::copy(entry.path(), dest).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;

    #[tokio::test]
    async fn test_copies_nested_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        fs::create_dir_all(from.join("a/b")).await.unwrap();
        fs::write(from.join("top.txt"), "top").await.unwrap();
        fs::write(from.join("a/b/deep.txt"), "deep").await.unwrap();

        let to = dir.path().join("to");
        fs::create_dir_all(&to).await.unwrap();
        fs::write(to.join("top.txt"), "old").await.unwrap();
        fs::write(to.join("kept.txt"), "kept").await.unwrap();

        copy_tree(&from, &to).await.unwrap();

        assert_eq!(fs::read_to_string(to.join("top.txt")).await.unwrap(), "top");
        assert_eq!(fs::read_to_string(to.join("a/b/deep.txt")).await.unwrap(), "deep");
        assert_eq!(fs::read_to_string(to.join("kept.txt")).await.unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = assert_err!(copy_tree(&dir.path().join("absent"), &dir.path().join("to")).await);
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
