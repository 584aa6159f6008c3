//! Configuration loading and typed config structures for the turn engine.
//!
//! The configuration lives in an optional `ebonfall-config.yaml`. Every field
//! has a default, so an empty file (or no file at all) is a valid
//! configuration. A few values can be overridden from the environment:
//!
//! - `EBONFALL_NARRATIVE_TIMEOUT_MS` overrides `narrative.timeout_ms`
//! - `EBONFALL_TEMPLATES_DIR` overrides `narrative.templates_dir`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Environment variable overriding [`NarrativeConfig::timeout_ms`].
pub const TIMEOUT_ENV: &str = "EBONFALL_NARRATIVE_TIMEOUT_MS";

/// Environment variable overriding [`NarrativeConfig::templates_dir`].
pub const TEMPLATES_ENV: &str = "EBONFALL_TEMPLATES_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    Env {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A setting parsed but holds a value the engine cannot run with.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Narrative generation settings.
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Logging settings for the binary.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`Self::parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML,
    /// [`ConfigError::Env`] if an override is malformed, or
    /// [`ConfigError::Invalid`] if the merged result fails [`Self::validate`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with_overrides(yaml, |name| std::env::var(name).ok())
    }

    /// Parse configuration from a YAML string, applying overrides from
    /// `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::parse`].
    pub fn parse_with_overrides<F>(yaml: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if an override is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot drive a turn.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `narrative.timeout_ms` is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.narrative.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "narrative.timeout_ms",
                reason: "must be greater than 0",
            });
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if an override is malformed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if the timeout override is not a
    /// positive integer.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(TIMEOUT_ENV) {
            self.narrative.timeout_ms = match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::Env {
                        name: TIMEOUT_ENV,
                        value,
                    });
                }
            };
        }
        if let Some(value) = lookup(TEMPLATES_ENV) {
            self.narrative.templates_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }
}

/// Narrative generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NarrativeConfig {
    /// Deadline for one narrative call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Directory holding `gm_system.j2`. `None` uses the built-in template.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

impl NarrativeConfig {
    /// The narrative deadline as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            templates_dir: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

const fn default_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_owned()
}
