//! The "make config" pass.
//!
//! Runs alongside the main build over the configuration-relevant directories
//! and aggregates what the client loader needs at startup: every declared
//! module with its `requires` list, and the available locales. The result is
//! written as `build_config.json` at the job's output root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use kiln_config::FrameworkMeta;

use crate::compiler::FileClass;
use crate::counter::CompletionCounter;
use crate::enumerator::{Enumerator, FileTask, path_key};
use crate::ignore::IgnoreSet;
use crate::module_wrapper::parse_module_header;

/// File name of the aggregate config inside a build.
pub const BUILD_CONFIG_FILE: &str = "build_config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub path: String,
    pub requires: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub name: String,
    pub version: String,
}

/// Aggregate build configuration.
///
/// Contains nothing specific to one build job, so two builds of the same
/// sources produce the same file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub framework: FrameworkInfo,
    pub modules: BTreeMap<String, ModuleEntry>,
    pub locales: Vec<String>,
}

impl BuildManifest {
    pub async fn write_to(&self, out_dir: &Path) -> std::io::Result<PathBuf> {
        let path = out_dir.join(BUILD_CONFIG_FILE);
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

#[derive(Debug, Default)]
struct Collected {
    modules: BTreeMap<String, ModuleEntry>,
    locales: Vec<String>,
}

/// One run of the config pass.
#[derive(Debug)]
pub struct ConfigPass {
    root: PathBuf,
    enumerator: Enumerator,
    ignore: Arc<IgnoreSet>,
}

impl ConfigPass {
    pub fn new(root: impl Into<PathBuf>, dirs: Vec<PathBuf>, ignore: Arc<IgnoreSet>) -> Self {
        let root = root.into();
        Self {
            enumerator: Enumerator::new(root.clone(), dirs),
            root,
            ignore,
        }
    }

    /// Scan the config directories and aggregate the manifest.
    ///
    /// Unreadable files are logged and left out.
    pub async fn run(self, framework: &FrameworkMeta) -> BuildManifest {
        let counter = CompletionCounter::new();
        let collected = Arc::new(Mutex::new(Collected::default()));

        let enumerator = self.enumerator.clone();
        let tasks = match tokio::task::spawn_blocking(move || enumerator.walk()).await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!("config scan aborted: {err}");
                Vec::new()
            }
        };

        for task in tasks {
            let guard = counter.increment();
            if self.ignore.is_ignored(&task.source_key()) {
                drop(guard);
                continue;
            }
            let root = self.root.clone();
            let collected = Arc::clone(&collected);
            tokio::spawn(async move {
                collect(&root, task, &collected).await;
                guard.complete();
            });
        }
        counter.seal();
        counter.wait().await;

        let Collected {
            modules,
            mut locales,
        } = std::mem::take(&mut *collected.lock());
        locales.sort();
        locales.dedup();

        tracing::debug!(
            modules = modules.len(),
            locales = locales.len(),
            "config pass complete"
        );
        BuildManifest {
            framework: FrameworkInfo {
                name: framework.name.clone(),
                version: framework.version.clone(),
            },
            modules,
            locales,
        }
    }
}

async fn collect(root: &Path, task: FileTask, collected: &Mutex<Collected>) {
    match task.class {
        FileClass::Locale => {
            if let Some(stem) = task.source.file_stem().and_then(|s| s.to_str()) {
                collected.lock().locales.push(stem.to_string());
            }
        }
        FileClass::ModuleJs | FileClass::RoutesJs => {
            let text = match tokio::fs::read_to_string(root.join(&task.source)).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(path = %task.source.display(), "config pass cannot read file: {err}");
                    return;
                }
            };
            if let Some(header) = parse_module_header(&text) {
                let entry = ModuleEntry {
                    path: path_key(&task.dest),
                    requires: header.requires,
                };
                let mut collected = collected.lock();
                if let Some(previous) = collected.modules.insert(header.name.clone(), entry) {
                    tracing::warn!(
                        module = %header.name,
                        previous = %previous.path,
                        "module declared twice, keeping the later one"
                    );
                }
            }
        }
        _ => {}
    }
}
