//! Configuration resolution for kiln.
//!
//! Two inputs are resolved here:
//!
//! - [`AppConfig`]: the application config (`kiln.toml` plus an optional
//!   environment overlay and `KILN_*` variables). It is cheap to reload and the
//!   dev server re-reads it on every request.
//! - [`FrameworkMeta`]: framework name, version and copyright, read from a
//!   fixed file. Failing to load it aborts a build.

pub mod app;
pub mod environment;
pub mod error;
pub mod framework;
pub mod validation;

pub use app::{
    AppConfig, CONFIG_FILE, CiConfig, CopyrightConfig, DEFAULT_PORT, FixtureRule, HttpsConfig,
    MinifyConfig, TlsMaterial,
};
pub use environment::Environment;
pub use error::{ConfigError, Result};
pub use framework::{FRAMEWORK_META_FILE, FrameworkMeta};
