//! Build names and stale build cleanup.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::error::{BuildError, Result};

/// Name of one build's output directory under the build root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildName(String);

impl BuildName {
    /// Validate a user-supplied name.
    ///
    /// The name becomes a single directory component, so separators, `.`,
    /// `..` and empty names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.chars().any(char::is_control);
        if valid {
            Ok(Self(name))
        } else {
            Err(BuildError::InvalidBuildName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for BuildName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// All-digit directory names are considered generated build names.
pub fn is_timestamp_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Source of build names when none is given explicitly.
pub trait BuildIdGenerator: Send + Sync + fmt::Debug {
    fn next_id(&self) -> String;
}

/// Millisecond Unix timestamps, strictly increasing within a process.
#[derive(Debug, Default)]
pub struct TimestampIds {
    last: AtomicI64,
}

impl TimestampIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BuildIdGenerator for TimestampIds {
    fn next_id(&self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Deterministic ids `start`, `start + 1`, ...
#[derive(Debug)]
pub struct SequenceIds {
    next: AtomicU64,
}

impl SequenceIds {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl BuildIdGenerator for SequenceIds {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::AcqRel).to_string()
    }
}

/// Remove every generated build under `build_root` except `keep`.
///
/// Best-effort: failures are logged and skipped. Returns the number of
/// directories removed.
pub async fn remove_stale_builds(build_root: &Path, keep: &BuildName) -> usize {
    let mut entries = match tokio::fs::read_dir(build_root).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(path = %build_root.display(), "cannot scan build root: {err}");
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!("stopping stale build scan: {err}");
                break;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_timestamp_name(name) || name == keep.as_str() {
            continue;
        }
        match entry.file_type().await {
            Ok(kind) if kind.is_dir() => {}
            _ => continue,
        }

        match tokio::fs::remove_dir_all(entry.path()).await {
            Ok(()) => {
                tracing::debug!(build = name, "removed stale build");
                removed += 1;
            }
            Err(err) => tracing::warn!(build = name, "cannot remove stale build: {err}"),
        }
    }
    removed
}
