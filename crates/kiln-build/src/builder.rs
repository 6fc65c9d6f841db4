//! Build orchestration.
//!
//! A [`Builder`] owns exactly one build job: one output directory named after
//! the build, filled from the application's source directories. Every file is
//! an independent unit of work tracked by a [`CompletionCounter`]; the job
//! finalizes once all units are done and the config pass has produced the
//! aggregate manifest.
//!
//! Only startup problems are fatal. Once files are being processed, a unit
//! that fails is logged and counted like any other.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use kiln_config::{AppConfig, Environment, FrameworkMeta};

use crate::compiler::{CompileContext, CompilerRegistry, FileClass, TemplateVars, source_vars};
use crate::counter::{CompletionCounter, UnitGuard};
use crate::enumerator::{Enumerator, FileTask, path_key};
use crate::error::{BuildError, Result, UnitError};
use crate::finalize::{BannerPlan, Minifier, MinifyReport, WrittenFile, run_post_build};
use crate::fs::ensure_ancestors;
use crate::ignore::IgnoreSet;
use crate::manifest::{BuildManifest, ConfigPass};
use crate::naming::{BuildIdGenerator, BuildName, TimestampIds, remove_stale_builds};

/// Lifecycle of a build job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Enumerating,
    Processing,
    Finalizing,
    Done,
}

/// Inputs of [`Builder::init`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub root: PathBuf,
    /// Explicit build name; generated by `ids` when absent.
    pub name: Option<String>,
    pub environment: Environment,
    /// Run the external minifier when one is configured.
    pub minify: bool,
    pub ids: Arc<dyn BuildIdGenerator>,
}

impl BuildOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            name: None,
            environment: Environment::Default,
            minify: true,
            ids: Arc::new(TimestampIds::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn BuildIdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub name: String,
    pub out_dir: PathBuf,
    /// Units dispatched to the counter, ignored files and the entry included.
    pub units: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub entry_written: bool,
    pub manifest: BuildManifest,
    pub banners: usize,
    pub minify: Option<MinifyReport>,
    pub post_build_ok: bool,
}

#[derive(Debug, Default)]
struct Stats {
    written: Vec<WrittenFile>,
    skipped: usize,
    failed: usize,
    entry_written: bool,
}

/// State shared by the units of one job.
#[derive(Debug)]
struct JobContext {
    root: PathBuf,
    out_dir: PathBuf,
    registry: Arc<CompilerRegistry>,
    vars: TemplateVars,
    stats: Mutex<Stats>,
}

#[derive(Debug)]
pub struct Builder {
    config: Arc<AppConfig>,
    framework: Arc<FrameworkMeta>,
    name: BuildName,
    out_dir: PathBuf,
    enumerator: Enumerator,
    registry: Arc<CompilerRegistry>,
    ignore: Arc<IgnoreSet>,
    minify: bool,
    state: watch::Sender<BuildState>,
    started: AtomicBool,
}

impl Builder {
    /// Resolve config, framework metadata and the build name.
    ///
    /// Touches nothing on disk, so a failure here leaves the build root as it
    /// was.
    pub fn init(options: BuildOptions) -> Result<Self> {
        let config = AppConfig::load(&options.root, options.environment)?;
        let framework = FrameworkMeta::load(&config.framework_path())?;
        Self::from_config(config, framework, &options)
    }

    /// Like [`Builder::init`] with config and metadata already resolved.
    pub fn from_config(
        config: AppConfig,
        framework: FrameworkMeta,
        options: &BuildOptions,
    ) -> Result<Self> {
        let name = match &options.name {
            Some(name) => BuildName::new(name.clone())?,
            None => BuildName::new(options.ids.next_id())?,
        };
        let ignore = IgnoreSet::from_config(&config)?;
        let out_dir = config.build_root_path().join(name.as_str());
        let enumerator = Enumerator::new(config.root.clone(), config.source_dirs());
        let (state, _) = watch::channel(BuildState::Enumerating);

        Ok(Self {
            config: Arc::new(config),
            framework: Arc::new(framework),
            name,
            out_dir,
            enumerator,
            registry: Arc::new(CompilerRegistry::standard()),
            ignore: Arc::new(ignore),
            minify: options.minify,
            state,
            started: AtomicBool::new(false),
        })
    }

    /// Use a custom stage table.
    pub fn with_registry(mut self, registry: CompilerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn name(&self) -> &BuildName {
        &self.name
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn framework(&self) -> &FrameworkMeta {
        &self.framework
    }

    pub fn state(&self) -> BuildState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BuildState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: BuildState) {
        tracing::debug!(build = %self.name, ?state, "build state");
        self.state.send_replace(state);
    }

    /// Run the job. A builder runs at most once.
    pub async fn build(&self) -> Result<BuildReport> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(BuildError::AlreadyBuilt(self.name.to_string()));
        }

        let build_root = self.config.build_root_path();
        tokio::fs::create_dir_all(&build_root)
            .await
            .map_err(|source| BuildError::OutputRoot {
                path: build_root.clone(),
                source,
            })?;

        if tokio::fs::try_exists(&self.out_dir).await.unwrap_or(false) {
            return Err(self.duplicate());
        }
        let removed = remove_stale_builds(&build_root, &self.name).await;
        if removed > 0 {
            tracing::info!(removed, "removed stale builds");
        }

        match tokio::fs::create_dir(&self.out_dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(self.duplicate());
            }
            Err(source) => {
                return Err(BuildError::OutputRoot {
                    path: self.out_dir.clone(),
                    source,
                });
            }
        }
        tracing::info!(build = %self.name, out = %self.out_dir.display(), "build started");

        let job = Arc::new(JobContext {
            root: self.config.root.clone(),
            out_dir: self.out_dir.clone(),
            registry: Arc::clone(&self.registry),
            vars: source_vars(Some(&self.framework)),
            stats: Mutex::new(Stats::default()),
        });

        let config_pass = {
            let pass = ConfigPass::new(
                self.config.root.clone(),
                self.config.config_dirs(),
                Arc::clone(&self.ignore),
            );
            let framework = Arc::clone(&self.framework);
            let out_dir = self.out_dir.clone();
            tokio::spawn(async move {
                let manifest = pass.run(&framework).await;
                match manifest.write_to(&out_dir).await {
                    Ok(path) => tracing::debug!(path = %path.display(), "wrote build config"),
                    Err(err) => tracing::warn!("cannot write build config: {err}"),
                }
                manifest
            })
        };

        let counter = CompletionCounter::new();
        self.dispatch_entry(&job, &build_root, counter.increment());

        let enumerator = self.enumerator.clone();
        let tasks = match tokio::task::spawn_blocking(move || enumerator.walk()).await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!("source scan aborted: {err}");
                Vec::new()
            }
        };

        self.set_state(BuildState::Processing);
        for task in tasks {
            let guard = counter.increment();
            let key = task.source_key();
            if self.ignore.is_ignored(&key) {
                tracing::trace!(path = %key, "ignored");
                job.stats.lock().skipped += 1;
                drop(guard);
                continue;
            }
            let job = Arc::clone(&job);
            tokio::spawn(async move {
                process_file(&job, task).await;
                guard.complete();
            });
        }
        counter.seal();
        counter.wait().await;

        let manifest = config_pass.await.unwrap_or_else(|err| {
            tracing::warn!("config pass aborted: {err}");
            BuildManifest::default()
        });

        self.set_state(BuildState::Finalizing);
        let stats = std::mem::take(&mut *job.stats.lock());
        let report = self.finalize(stats, counter.dispatched(), manifest).await;
        self.set_state(BuildState::Done);

        tracing::info!(
            build = %self.name,
            written = report.written,
            skipped = report.skipped,
            failed = report.failed,
            "build finished"
        );
        Ok(report)
    }

    fn duplicate(&self) -> BuildError {
        BuildError::DuplicateBuildName {
            name: self.name.to_string(),
            path: self.out_dir.clone(),
        }
    }

    /// Compile the shell page into `<build root>/<entry file name>`.
    fn dispatch_entry(&self, job: &Arc<JobContext>, build_root: &Path, guard: UnitGuard) {
        let source = self.config.resolve(&self.config.entry);
        let file_name = self
            .config
            .entry
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("index.html"));
        let dest = build_root.join(file_name);
        let key = path_key(&self.config.entry);
        let mut vars = job.vars.clone();
        vars.insert("basepath", format!("/{}", self.name));
        let job = Arc::clone(job);

        tokio::spawn(async move {
            let result: std::result::Result<(), UnitError> = async {
                let input = tokio::fs::read(&source).await?;
                let ctx = CompileContext {
                    path: &key,
                    vars: &vars,
                };
                let output = job.registry.compile(FileClass::Html, &input, &ctx)?;
                tokio::fs::write(&dest, output).await?;
                Ok(())
            }
            .await;
            match result {
                Ok(()) => job.stats.lock().entry_written = true,
                Err(err) => tracing::warn!(path = %key, "cannot build entry page: {err}"),
            }
            guard.complete();
        });
    }

    async fn finalize(&self, stats: Stats, units: usize, manifest: BuildManifest) -> BuildReport {
        let banners = match BannerPlan::new(&self.config, &self.framework) {
            Some(plan) => plan.apply(&self.out_dir, &stats.written).await,
            None => 0,
        };

        let minify = match Minifier::from_config(&self.config.minify) {
            Some(minifier) if self.minify => {
                tracing::info!(workers = minifier.workers(), "minifying");
                Some(minifier.run(&self.out_dir, &stats.written).await)
            }
            _ => None,
        };

        let post_build_ok = run_post_build(&self.config, self.name.as_str(), &self.out_dir).await;

        BuildReport {
            name: self.name.to_string(),
            out_dir: self.out_dir.clone(),
            units,
            written: stats.written.len(),
            skipped: stats.skipped,
            failed: stats.failed,
            entry_written: stats.entry_written,
            manifest,
            banners,
            minify,
            post_build_ok,
        }
    }
}

async fn process_file(job: &JobContext, task: FileTask) {
    let key = task.source_key();
    tracing::debug!(path = %key, class = task.class.as_str(), "processing");

    let result: std::result::Result<(), UnitError> = async {
        ensure_ancestors(&job.out_dir, &task.dest).await?;
        let input = tokio::fs::read(job.root.join(&task.source)).await?;
        let ctx = CompileContext {
            path: &key,
            vars: &job.vars,
        };
        let output = job.registry.compile(task.class, &input, &ctx)?;
        tokio::fs::write(job.out_dir.join(&task.dest), output).await?;
        Ok(())
    }
    .await;

    let mut stats = job.stats.lock();
    match result {
        Ok(()) => stats.written.push(WrittenFile {
            rel: task.dest,
            class: task.class,
        }),
        Err(err) => {
            tracing::warn!(path = %key, "skipping file: {err}");
            stats.failed += 1;
        }
    }
}
