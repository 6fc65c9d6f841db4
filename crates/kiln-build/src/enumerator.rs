//! Source tree enumeration.
//!
//! The enumerator walks the configured source directories in a stable order
//! and classifies every regular file it finds. It performs no I/O beyond the
//! directory walk; reading and writing belongs to the builder.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::compiler::FileClass;

/// One file to process, relative to the application root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub source: PathBuf,
    pub class: FileClass,
    /// Output path relative to the job's output directory.
    pub dest: PathBuf,
}

impl FileTask {
    pub fn new(source: PathBuf) -> Self {
        let class = FileClass::classify(&source);
        Self {
            dest: source.clone(),
            source,
            class,
        }
    }

    /// Source path with `/` separators, as matched by ignore patterns.
    pub fn source_key(&self) -> String {
        path_key(&self.source)
    }
}

/// Render a relative path with `/` separators on every platform.
pub fn path_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    root: PathBuf,
    dirs: Vec<PathBuf>,
}

impl Enumerator {
    /// `dirs` are relative to `root`. Missing directories are skipped.
    pub fn new(root: impl Into<PathBuf>, dirs: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirs,
        }
    }

    /// Walk every directory and return its files in a stable order.
    pub fn walk(&self) -> Vec<FileTask> {
        let mut tasks = Vec::new();

        for dir in &self.dirs {
            let abs = self.root.join(dir);
            let escapes = dir.components().any(|c| matches!(c, Component::ParentDir));
            if escapes || !abs.starts_with(&self.root) {
                tracing::warn!(dir = %dir.display(), "source directory is outside the application root, skipping");
                continue;
            }
            if !abs.is_dir() {
                tracing::debug!(dir = %dir.display(), "source directory not present, skipping");
                continue;
            }

            for entry in WalkDir::new(&abs)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_hidden(e.file_name()))
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::warn!("skipping unreadable entry: {err}");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                    tracing::warn!(path = %entry.path().display(), "file is outside the application root, skipping");
                    continue;
                };
                tasks.push(FileTask::new(rel.to_path_buf()));
            }
        }

        tracing::debug!(files = tasks.len(), "enumerated source tree");
        tasks
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.') && n.len() > 1)
}
