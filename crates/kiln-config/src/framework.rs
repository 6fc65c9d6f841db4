//! Framework-level metadata (name, version, copyright).
//!
//! Read from the fixed file `<framework_dir>/framework.json`. Unlike the
//! application config, this file has no defaults: a build cannot start
//! without it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// File name of the framework metadata inside the framework directory.
pub const FRAMEWORK_META_FILE: &str = "framework.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkMeta {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl FrameworkMeta {
    /// Path of the metadata file for a framework directory.
    pub fn path_in(framework_dir: &Path) -> PathBuf {
        framework_dir.join(FRAMEWORK_META_FILE)
    }

    /// Load metadata from `<framework_dir>/framework.json`.
    ///
    /// # Errors
    ///
    /// `FrameworkMetaUnreadable` if the file cannot be read and
    /// `FrameworkMetaInvalid` if it is not valid JSON of the expected shape.
    pub fn load(framework_dir: &Path) -> Result<Self> {
        let path = Self::path_in(framework_dir);
        let content = fs::read_to_string(&path).map_err(|source| {
            ConfigError::FrameworkMetaUnreadable {
                path: path.clone(),
                source,
            }
        })?;
        let meta: FrameworkMeta = serde_json::from_str(&content)
            .map_err(|source| ConfigError::FrameworkMetaInvalid { path, source })?;
        tracing::debug!(name = %meta.name, version = %meta.version, "loaded framework metadata");
        Ok(meta)
    }
}
