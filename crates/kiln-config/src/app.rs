//! Application configuration (`kiln.toml`).
//!
//! Sources are merged with figment, later sources winning:
//! defaults < `kiln.toml` < environment overlay (`kiln.dev.toml`,
//! `kiln.tests.toml`) < `KILN_*` environment variables.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::{ConfigError, Result};

/// Name of the base config file at the application root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 1636;

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application root; every relative path below is resolved against it.
    #[serde(skip)]
    pub root: PathBuf,

    /// Environment this config was resolved for.
    #[serde(skip)]
    pub environment: Environment,

    /// Directory holding the framework (`core/` and `framework.json`).
    pub framework_dir: PathBuf,

    /// Directory receiving versioned builds.
    pub build_root: PathBuf,

    /// Application shell page.
    pub entry: PathBuf,

    /// Plugin directories compiled alongside the core set.
    pub plugins: Vec<PathBuf>,

    /// Extra ignore patterns (regexes over `/`-separated relative paths).
    pub ignore: Vec<String>,

    /// Dev server port.
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<HttpsConfig>,

    /// Mocked API rules, first match wins.
    pub fixtures: Vec<FixtureRule>,

    pub copyright: CopyrightConfig,

    pub minify: MinifyConfig,

    /// Command chained after a successful build finalization.
    pub post_build: Vec<String>,

    pub ci: CiConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<PathBuf>,
}

/// Key and certificate paths, both present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub key: PathBuf,
    pub cert: PathBuf,
}

/// A path regex mapped to an opaque response specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRule {
    pub path: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyrightConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Output paths (regexes) that receive a copyright banner.
    pub banner: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinifyConfig {
    pub enabled: bool,
    /// External minifier invocation. `{file}` and `{type}` (js or css) are
    /// substituted per output file. Empty disables minification.
    pub command: Vec<String>,
    /// Maximum concurrent minifier processes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: Vec::new(),
            workers: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiConfig {
    /// Host the browser is pointed at.
    pub host: String,
    /// Browser flavor: chromium, chrome or firefox.
    pub browser: String,
    /// Watchdog in seconds.
    pub timeout_secs: u64,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            browser: "chromium".to_string(),
            timeout_secs: 10 * 60,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            environment: Environment::Default,
            framework_dir: PathBuf::from("framework"),
            build_root: PathBuf::from("build"),
            entry: PathBuf::from("index.html"),
            plugins: vec![PathBuf::from("plugins")],
            ignore: Vec::new(),
            port: DEFAULT_PORT,
            https: None,
            fixtures: Vec::new(),
            copyright: CopyrightConfig::default(),
            minify: MinifyConfig::default(),
            post_build: Vec::new(),
            ci: CiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the configuration of the application rooted at `root`.
    ///
    /// Missing config files are not an error: an application without a
    /// `kiln.toml` runs on defaults.
    pub fn load(root: &Path, environment: Environment) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(root.join(CONFIG_FILE)));

        if let Some(overlay) = environment.overlay_file() {
            figment = figment.merge(Toml::file(root.join(overlay)));
        }

        figment = figment.merge(Env::prefixed("KILN_").split("__"));

        let mut config: AppConfig = figment.extract()?;
        config.root = root.to_path_buf();
        config.environment = environment;
        tracing::debug!(root = %root.display(), %environment, "resolved application config");
        Ok(config)
    }

    /// Resolve a config-relative path against the application root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn framework_path(&self) -> PathBuf {
        self.resolve(&self.framework_dir)
    }

    pub fn build_root_path(&self) -> PathBuf {
        self.resolve(&self.build_root)
    }

    /// Core source directories, relative to the root.
    pub fn core_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.framework_dir.join("core"),
            PathBuf::from("locales"),
            PathBuf::from("views"),
            PathBuf::from("config"),
        ]
    }

    /// Core directories followed by configured plugins, without overlaps.
    pub fn source_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.core_dirs();
        dirs.extend(self.plugins.iter().cloned());
        dedup_dirs(dirs)
    }

    /// Directories scanned by the aggregate config pass, without overlaps.
    pub fn config_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from("locales")];
        dirs.extend(self.plugins.iter().cloned());
        dirs.push(PathBuf::from("views"));
        dirs.push(PathBuf::from("config"));
        dedup_dirs(dirs)
    }

    /// Built-in ignore patterns followed by the configured ones.
    pub fn ignore_patterns(&self) -> Vec<String> {
        let framework = self.framework_dir.to_string_lossy().replace('\\', "/");
        let mut patterns = vec![
            "^config/config\\.js$".to_string(),
            "^config/app_config\\.js$".to_string(),
            format!("^{}/core/core_config\\.js$", regex::escape(&framework)),
            "/tests/".to_string(),
            "\\.tpl\\.html$".to_string(),
        ];
        patterns.extend(self.ignore.iter().cloned());
        patterns
    }

    /// TLS material when https is configured.
    ///
    /// # Errors
    ///
    /// `TlsIncomplete` when the `[https]` table lacks the key or the cert.
    pub fn tls_material(&self) -> Result<Option<TlsMaterial>> {
        let Some(https) = &self.https else {
            return Ok(None);
        };
        let key = https
            .key
            .as_ref()
            .ok_or(ConfigError::TlsIncomplete { missing: "key" })?;
        let cert = https
            .cert
            .as_ref()
            .ok_or(ConfigError::TlsIncomplete { missing: "cert" })?;
        Ok(Some(TlsMaterial {
            key: self.resolve(key),
            cert: self.resolve(cert),
        }))
    }

    /// First fixture rule whose path regex matches `path`.
    ///
    /// Rules with an invalid regex never match.
    pub fn match_fixture(&self, path: &str) -> Option<&FixtureRule> {
        self.fixtures.iter().find(|rule| match Regex::new(&rule.path) {
            Ok(re) => re.is_match(path),
            Err(err) => {
                tracing::warn!(pattern = %rule.path, "skipping invalid fixture pattern: {err}");
                false
            }
        })
    }
}

/// Keep the first occurrence of each directory and drop directories nested
/// inside another listed one, so no tree is walked twice.
fn dedup_dirs(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.iter()
        .enumerate()
        .filter(|&(i, dir)| {
            !dirs.iter().enumerate().any(|(j, other)| {
                if other == dir {
                    j < i
                } else {
                    dir.starts_with(other)
                }
            })
        })
        .map(|(_, dir)| dir.clone())
        .collect()
}
