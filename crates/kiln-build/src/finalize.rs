//! Post-processing of a finished build: copyright banners, external
//! minification and the chained post-build command.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use regex::Regex;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use kiln_config::{AppConfig, FrameworkMeta, MinifyConfig};

use crate::compiler::FileClass;
use crate::enumerator::path_key;

/// A file the build wrote under the job's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub rel: PathBuf,
    pub class: FileClass,
}

/// Banner text for one copyright scope, e.g. `/*! kiln v2.1.0 | MIT */`.
pub fn banner_line(name: &str, version: Option<&str>, notice: Option<&str>) -> String {
    let mut line = format!("/*! {name}");
    if let Some(version) = version {
        line.push_str(" v");
        line.push_str(version);
    }
    if let Some(notice) = notice {
        line.push_str(" | ");
        line.push_str(notice);
    }
    line.push_str(" */\n");
    line
}

/// Decides which outputs receive a banner and which banner they get.
#[derive(Debug)]
pub struct BannerPlan {
    patterns: Vec<Regex>,
    framework_prefix: String,
    framework_banner: String,
    app_banner: Option<String>,
}

impl BannerPlan {
    /// `None` when no banner patterns are configured.
    pub fn new(config: &AppConfig, framework: &FrameworkMeta) -> Option<Self> {
        let patterns: Vec<Regex> = config
            .copyright
            .banner
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!(pattern = %p, "skipping invalid banner pattern: {err}");
                    None
                }
            })
            .collect();
        if patterns.is_empty() {
            return None;
        }

        let app_banner = config.copyright.name.as_deref().map(|name| {
            banner_line(
                name,
                config.copyright.version.as_deref(),
                config.copyright.notice.as_deref(),
            )
        });

        Some(Self {
            patterns,
            framework_prefix: format!("{}/", path_key(&config.framework_dir)),
            framework_banner: banner_line(
                &framework.name,
                Some(&framework.version),
                framework.copyright.as_deref(),
            ),
            app_banner,
        })
    }

    /// Banner for `file`, if it should get one.
    pub fn banner_for(&self, file: &WrittenFile) -> Option<&str> {
        if !matches!(
            file.class,
            FileClass::ModuleJs | FileClass::RoutesJs | FileClass::Css
        ) {
            return None;
        }
        let key = path_key(&file.rel);
        if !self.patterns.iter().any(|re| re.is_match(&key)) {
            return None;
        }
        if key.starts_with(&self.framework_prefix) {
            Some(self.framework_banner.as_str())
        } else {
            self.app_banner.as_deref()
        }
    }

    /// Prepend banners in place. Returns how many files were stamped.
    pub async fn apply(&self, out_dir: &Path, files: &[WrittenFile]) -> usize {
        let mut stamped = 0;
        for file in files {
            let Some(banner) = self.banner_for(file) else {
                continue;
            };
            let path = out_dir.join(&file.rel);
            let result = async {
                let body = tokio::fs::read(&path).await?;
                let mut out = Vec::with_capacity(banner.len() + body.len());
                out.extend_from_slice(banner.as_bytes());
                out.extend_from_slice(&body);
                tokio::fs::write(&path, out).await
            }
            .await;
            match result {
                Ok(()) => stamped += 1,
                Err(err) => {
                    tracing::warn!(path = %file.rel.display(), "cannot apply banner: {err}")
                }
            }
        }
        stamped
    }
}

/// Outcome counts of a minification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinifyReport {
    pub minified: usize,
    pub failed: usize,
}

/// Runs the external minifier once per file with bounded parallelism.
#[derive(Debug, Clone)]
pub struct Minifier {
    command: Vec<String>,
    workers: usize,
}

impl Minifier {
    /// `None` when minification is disabled or no command is configured.
    pub fn from_config(config: &MinifyConfig) -> Option<Self> {
        if !config.enabled || config.command.is_empty() {
            return None;
        }
        Some(Self {
            command: config.command.clone(),
            workers: config
                .workers
                .unwrap_or_else(|| num_cpus::get().min(8))
                .max(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Command line for one file, with `{file}` and `{type}` substituted.
    pub fn command_line(&self, file: &Path, kind: &str) -> Vec<String> {
        let file = file.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace("{file}", &file).replace("{type}", kind))
            .collect()
    }

    /// Minify every JS/CSS output under `out_dir`.
    ///
    /// The command rewrites the file in place. Failures are logged per file.
    pub async fn run(&self, out_dir: &Path, files: &[WrittenFile]) -> MinifyReport {
        let mut join_set = JoinSet::new();
        let semaphore = Arc::new(Semaphore::new(self.workers));

        for file in files {
            let Some(kind) = file.class.minify_kind() else {
                continue;
            };
            let argv = self.command_line(&out_dir.join(&file.rel), kind);
            let rel = file.rel.clone();
            let permit = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let Ok(_permit) = permit.acquire().await else {
                    return (rel, Err("worker pool closed".to_string()));
                };
                let result = run_command(&argv).await;
                (rel, result)
            });
        }

        let mut report = MinifyReport::default();
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((_, Ok(()))) => report.minified += 1,
                Ok((rel, Err(message))) => {
                    tracing::warn!(path = %rel.display(), "minification failed: {message}");
                    report.failed += 1;
                }
                Err(join_err) => {
                    tracing::warn!("minifier task panicked: {join_err}");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

async fn run_command(argv: &[String]) -> Result<(), String> {
    let (program, args) = argv.split_first().ok_or("empty command")?;
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| format!("cannot run {program}: {err}"))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

/// Run the configured post-build command from the application root.
///
/// Returns whether it succeeded. A missing command counts as success.
pub async fn run_post_build(
    config: &AppConfig,
    build_name: &str,
    out_dir: &Path,
) -> bool {
    let Some((program, args)) = config.post_build.split_first() else {
        return true;
    };
    tracing::info!(command = %config.post_build.join(" "), "running post-build step");

    let status = Command::new(program)
        .args(args)
        .current_dir(&config.root)
        .env("KILN_BUILD_NAME", build_name)
        .env("KILN_BUILD_DIR", out_dir)
        .stdin(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            tracing::warn!("post-build step exited with {status}");
            false
        }
        Err(err) => {
            tracing::warn!("cannot run post-build step {program}: {err}");
            false
        }
    }
}
