//! Configuration loading and the hot-swappable configuration store.
//!
//! The canonical configuration lives in `vocation-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, a loader
//! that reads and validates the file, and [`ConfigStore`], which serves the
//! current configuration to the core through the [`ConfigProvider`] and
//! [`MessageTemplates`] traits and can be swapped wholesale on reload.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use vocation_types::{Job, JobId, Title};

use crate::collaborators::{ConfigProvider, MessageTemplates};
use crate::messages::MessageKey;

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

    /// The configuration parsed but is not usable.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Description of the problem.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `vocation-config.yaml`. All fields have
/// defaults, so an empty file is a valid (job-less) configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobsConfig {
    /// Save and lifecycle settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Announcement settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// The job catalogue.
    #[serde(default)]
    pub jobs: Vec<Job>,

    /// Template overrides keyed by [`MessageKey::as_str`].
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

impl JobsConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml rejects an empty document; treat it as all-defaults.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the save period is positive, job ids are non-empty and unique,
    /// and every leveling curve is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.save_period_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("general.save_period_secs must be positive"),
            });
        }
        let mut seen = BTreeSet::new();
        for job in &self.jobs {
            if job.id.as_str().trim().is_empty() {
                return Err(ConfigError::Invalid {
                    reason: String::from("job id must not be empty"),
                });
            }
            if !seen.insert(job.id.as_str()) {
                return Err(ConfigError::Invalid {
                    reason: format!("duplicate job id {}", job.id),
                });
            }
            if job.experience_base <= Decimal::ZERO {
                return Err(ConfigError::Invalid {
                    reason: format!("job {} must have a positive experience_base", job.id),
                });
            }
            if job.max_level == Some(0) {
                return Err(ConfigError::Invalid {
                    reason: format!("job {} has max_level 0", job.id),
                });
            }
        }
        Ok(())
    }

    /// Interval between periodic saves.
    pub const fn save_period(&self) -> Duration {
        Duration::from_secs(self.general.save_period_secs)
    }
}

/// Save and lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneralConfig {
    /// Save and evict an actor's state as soon as they disconnect.
    #[serde(default)]
    pub save_on_disconnect: bool,

    /// Seconds between periodic bulk saves.
    #[serde(default = "default_save_period_secs")]
    pub save_period_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            save_on_disconnect: false,
            save_period_secs: default_save_period_secs(),
        }
    }
}

/// Announcement settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Announce level-ups to everyone.
    #[serde(default = "default_true")]
    pub on_levelup: bool,

    /// Announce title changes to everyone.
    #[serde(default = "default_true")]
    pub on_skillup: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            on_levelup: true,
            on_skillup: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_save_period_secs() -> u64 {
    600
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

/// One immutable configuration generation with its job catalogue indexed.
#[derive(Debug)]
struct Generation {
    config: JobsConfig,
    jobs: BTreeMap<JobId, Arc<Job>>,
}

impl Generation {
    fn new(config: JobsConfig) -> Self {
        let jobs = config
            .jobs
            .iter()
            .map(|job| (job.id.clone(), Arc::new(job.clone())))
            .collect();
        Self { config, jobs }
    }
}

/// Hot-swappable configuration served to the core.
///
/// Readers always see one complete generation. [`replace`](Self::replace)
/// installs a new generation atomically; job definitions handed out from the
/// previous generation stay valid for whoever still holds them, and the
/// registry rebinds to the new ones by id on
/// [`Registry::reload`](crate::Registry::reload).
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<Generation>>,
}

impl ConfigStore {
    /// Create a store serving `config`.
    pub fn new(config: JobsConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(Generation::new(config))),
        }
    }

    /// Load a store from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if loading or validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        JobsConfig::from_file(path).map(Self::new)
    }

    /// Install a new configuration generation.
    pub fn replace(&self, config: JobsConfig) {
        let next = Arc::new(Generation::new(config));
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> JobsConfig {
        self.generation().config.clone()
    }

    /// Every job in the current catalogue, ordered by id.
    pub fn jobs(&self) -> Vec<Arc<Job>> {
        self.generation().jobs.values().cloned().collect()
    }

    fn generation(&self) -> Arc<Generation> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }
}

impl ConfigProvider for ConfigStore {
    fn save_on_disconnect(&self) -> bool {
        self.generation().config.general.save_on_disconnect
    }

    fn broadcast_levelups(&self) -> bool {
        self.generation().config.broadcast.on_levelup
    }

    fn broadcast_skillups(&self) -> bool {
        self.generation().config.broadcast.on_skillup
    }

    fn title_for_level(&self, job: &JobId, level: u32) -> Option<Title> {
        self.generation()
            .jobs
            .get(job)
            .and_then(|job| job.title_for_level(level).cloned())
    }

    fn job(&self, job: &JobId) -> Option<Arc<Job>> {
        self.generation().jobs.get(job).cloned()
    }
}

impl MessageTemplates for ConfigStore {
    fn template_for(&self, key: MessageKey) -> String {
        self.generation()
            .config
            .messages
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| String::from(key.default_template()))
    }
}
