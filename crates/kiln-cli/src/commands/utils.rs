use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};

/// Application root: `--cwd` when given, the working directory otherwise.
pub(crate) fn resolve_root(cwd: Option<&Path>) -> Result<PathBuf> {
    let root = match cwd {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let root = std::fs::canonicalize(&root).with_path(&root)?;
    if !root.is_dir() {
        return Err(crate::error::CliError::InvalidArgument(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(root)
}
