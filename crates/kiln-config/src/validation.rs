use regex::Regex;

use crate::app::AppConfig;
use crate::error::{ConfigError, Result};

fn check_pattern(field: &str, pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidPattern {
            field: field.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

impl AppConfig {
    /// Validate configuration for logical consistency.
    ///
    /// Incomplete TLS material is reported here as well, but it only becomes
    /// fatal when the dev server starts.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                hint: "Pick a fixed port, the dev server URL must be stable".to_string(),
            });
        }

        if self.entry.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "entry".to_string(),
                value: String::new(),
                hint: "Set `entry` to the application shell page, e.g. index.html".to_string(),
            });
        }

        for pattern in &self.ignore {
            check_pattern("ignore", pattern)?;
        }
        for rule in &self.fixtures {
            check_pattern("fixtures.path", &rule.path)?;
        }
        for pattern in &self.copyright.banner {
            check_pattern("copyright.banner", pattern)?;
        }

        if self.minify.workers == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "minify.workers".to_string(),
                value: "0".to_string(),
                hint: "Use at least one worker or set minify.enabled = false".to_string(),
            });
        }

        self.tls_material()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{FixtureRule, HttpsConfig, MinifyConfig};
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_fixture_regex() {
        let config = AppConfig {
            fixtures: vec![FixtureRule {
                path: "^/api/(".to_string(),
                response: serde_json::Value::Null,
            }],
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref field, .. } if field == "fixtures.path"));
    }

    #[test]
    fn rejects_zero_port_and_workers() {
        let config = AppConfig {
            port: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            minify: MinifyConfig {
                workers: Some(0),
                ..MinifyConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn reports_incomplete_tls() {
        let config = AppConfig {
            https: Some(HttpsConfig {
                key: Some(PathBuf::from("key.pem")),
                cert: None,
            }),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TlsIncomplete { .. })
        ));
    }
}
