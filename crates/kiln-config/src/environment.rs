use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variant used to select the config overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Default,
    Dev,
    Tests,
}

impl Environment {
    /// Overlay file merged on top of `kiln.toml`, if any.
    pub fn overlay_file(self) -> Option<&'static str> {
        match self {
            Environment::Default => None,
            Environment::Dev => Some("kiln.dev.toml"),
            Environment::Tests => Some("kiln.tests.toml"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Default => "default",
            Environment::Dev => "dev",
            Environment::Tests => "tests",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "default" | "prod" | "production" => Ok(Environment::Default),
            "dev" | "development" => Ok(Environment::Dev),
            "tests" | "test" => Ok(Environment::Tests),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}
