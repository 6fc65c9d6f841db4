//! Directory helpers shared by concurrent file tasks.
//!
//! Many tasks write into the same directories at the same time, so every
//! creation here treats "already exists" as success.

use std::io;
use std::path::{Component, Path};

use tokio::fs;

/// Create a single directory, succeeding if it is already there.
pub async fn create_dir_idempotent(path: &Path) -> io::Result<()> {
    match fs::create_dir(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            if fs::metadata(path).await?.is_dir() {
                Ok(())
            } else {
                Err(err)
            }
        }
        Err(err) => Err(err),
    }
}

/// Create every missing ancestor of `rel` below `root`, one level at a time.
///
/// `rel` is the path of a file relative to `root`; its final component is not
/// created. `root` itself must exist.
pub async fn ensure_ancestors(root: &Path, rel: &Path) -> io::Result<()> {
    let Some(parent) = rel.parent() else {
        return Ok(());
    };

    let mut current = root.to_path_buf();
    for component in parent.components() {
        match component {
            Component::Normal(part) => {
                current.push(part);
                create_dir_idempotent(&current).await?;
            }
            Component::CurDir => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} escapes the output root", rel.display()),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_missing_ancestors_and_repeats_cleanly() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        let rel = PathBuf::from("a/b/c/file.js");

        ensure_ancestors(dir.path(), &rel).await.unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
        assert!(!dir.path().join("a/b/c/file.js").exists());

        ensure_ancestors(dir.path(), &rel).await.unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creation_of_shared_parents() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();

        let mut handles = Vec::new();
        for i in 0..32 {
            let root = root.clone();
            handles.push(tokio::spawn(async move {
                let rel = PathBuf::from(format!("views/shared/deep/f{i}.js"));
                ensure_ancestors(&root, &rel).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(root.join("views/shared/deep").is_dir());
    }

    #[tokio::test]
    async fn file_in_the_way_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), b"not a dir").unwrap();
        let err = create_dir_idempotent(&dir.path().join("a")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn parent_traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = ensure_ancestors(dir.path(), Path::new("../x/y.js"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
