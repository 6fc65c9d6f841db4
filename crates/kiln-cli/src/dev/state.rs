//! Shared state for the development server.
//!
//! The configuration is re-read from disk on every request so edits to
//! `kiln.toml` apply without a restart. A config that fails to parse is
//! reported and the last good one keeps serving.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_build::CompilerRegistry;
use kiln_config::{AppConfig, ConfigError, Environment};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::coverage::{CoverageInstrumenter, PassthroughInstrumenter};
use super::fixtures::{FixtureHandler, StaticFixtureHandler};
use super::unittests::TestReport;

#[derive(Debug)]
pub struct DevState {
    root: PathBuf,
    environment: Environment,
    port: Option<u16>,
    reload: bool,
    last_good: RwLock<Arc<AppConfig>>,
    registry: Arc<CompilerRegistry>,
    fixtures: Arc<dyn FixtureHandler>,
    coverage: Arc<dyn CoverageInstrumenter>,
    reports: Option<mpsc::Sender<TestReport>>,
}

impl DevState {
    /// Load the configuration of the application at `root`.
    ///
    /// `port` overrides the configured port for every later reload too.
    ///
    /// # Errors
    ///
    /// The first load is fatal; only later reloads fall back.
    pub fn load(
        root: impl Into<PathBuf>,
        environment: Environment,
        port: Option<u16>,
    ) -> Result<Self, ConfigError> {
        let root = root.into();
        let mut config = AppConfig::load(&root, environment)?;
        if let Some(port) = port {
            config.port = port;
        }
        if let Err(err) = config.validate() {
            tracing::warn!("configuration problem: {err}");
        }

        let mut state = Self::new(config);
        state.port = port;
        state.reload = true;
        Ok(state)
    }

    /// Serve a fixed configuration that is never reloaded.
    pub fn new(config: AppConfig) -> Self {
        Self {
            root: config.root.clone(),
            environment: config.environment,
            port: None,
            reload: false,
            last_good: RwLock::new(Arc::new(config)),
            registry: Arc::new(CompilerRegistry::standard()),
            fixtures: Arc::new(StaticFixtureHandler),
            coverage: Arc::new(PassthroughInstrumenter),
            reports: None,
        }
    }

    /// Accept `POST /__unittests/report` and forward reports to `sink`.
    pub fn with_report_sink(mut self, sink: mpsc::Sender<TestReport>) -> Self {
        self.reports = Some(sink);
        self
    }

    pub fn with_fixture_handler(mut self, handler: Arc<dyn FixtureHandler>) -> Self {
        self.fixtures = handler;
        self
    }

    pub fn with_instrumenter(mut self, instrumenter: Arc<dyn CoverageInstrumenter>) -> Self {
        self.coverage = instrumenter;
        self
    }

    pub fn with_registry(mut self, registry: CompilerRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configuration for the current request.
    ///
    /// The reload reads `kiln.toml` on the blocking pool.
    pub async fn current_config(&self) -> Arc<AppConfig> {
        if !self.reload {
            return self.last_good.read().clone();
        }

        let root = self.root.clone();
        let environment = self.environment;
        let loaded =
            tokio::task::spawn_blocking(move || AppConfig::load(&root, environment)).await;
        match loaded {
            Ok(Ok(mut config)) => {
                if let Some(port) = self.port {
                    config.port = port;
                }
                let config = Arc::new(config);
                *self.last_good.write() = config.clone();
                config
            }
            Ok(Err(err)) => {
                tracing::warn!("cannot reload configuration, keeping the last good one: {err}");
                self.last_good.read().clone()
            }
            Err(err) => {
                tracing::warn!("configuration reload aborted: {err}");
                self.last_good.read().clone()
            }
        }
    }

    pub fn registry(&self) -> &CompilerRegistry {
        &self.registry
    }

    pub fn fixtures(&self) -> &dyn FixtureHandler {
        self.fixtures.as_ref()
    }

    pub fn instrumenter(&self) -> &dyn CoverageInstrumenter {
        self.coverage.as_ref()
    }

    pub fn reports_enabled(&self) -> bool {
        self.reports.is_some()
    }

    /// Forward a CI report. Returns false without a sink.
    pub async fn submit_report(&self, report: TestReport) -> bool {
        match &self.reports {
            Some(sink) => {
                if sink.send(report).await.is_err() {
                    tracing::debug!("report receiver already gone");
                }
                true
            }
            None => false,
        }
    }
}
