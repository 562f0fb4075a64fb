//! Configuration management.
//!
//! Values come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or the platform config dir)
//! 3. `LINKWISE_*` environment variables
//!
//! ```toml
//! database_path = "/var/lib/linkwise/graph.db"
//!
//! [defaults]
//! maxSuggestions = 5
//! minConfidence = 0.4
//!
//! [engine]
//! max_concurrent = 8
//!
//! [logging]
//! format = "json"
//! ```

mod scoring;

pub use scoring::{ContentScoring, CountScoring, MS_PER_DAY, ScoringConfig, TemporalScoring};

use crate::models::SuggestionOptions;
use crate::observability::{LOG_FORMAT_ENV_VAR, LogFormat, LoggingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings for the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum node ids processed at once by the concurrent batch.
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Main configuration for linkwise.
#[derive(Debug, Clone)]
pub struct LinkwiseConfig {
    /// Path to the `SQLite` graph database.
    pub database_path: PathBuf,
    /// Options used when the caller supplies none.
    pub defaults: SuggestionOptions,
    /// Heuristic constants.
    pub scoring: ScoringConfig,
    /// Engine runtime settings.
    pub engine: EngineConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Database path.
    pub database_path: Option<String>,
    /// Default suggestion options.
    pub defaults: Option<SuggestionOptions>,
    /// Scoring constants.
    pub scoring: Option<ScoringConfig>,
    /// Engine section.
    pub engine: Option<EngineConfig>,
    /// Logging section.
    pub logging: Option<LoggingConfig>,
}

impl Default for LinkwiseConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            defaults: SuggestionOptions::default(),
            scoring: ScoringConfig::default(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LinkwiseConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// Sections missing from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting scoring constants or default options are invalid.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let config = Self::from_config_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/linkwise/` on macOS)
    /// 2. XDG config dir (`~/.config/linkwise/` for Unix compatibility)
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("linkwise").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("linkwise")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Applies `LINKWISE_*` environment variable overrides.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `LINKWISE_DB` | `database_path` |
    /// | `LINKWISE_MAX_SUGGESTIONS` | `defaults.max_suggestions` |
    /// | `LINKWISE_MIN_CONFIDENCE` | `defaults.min_confidence` |
    /// | `LINKWISE_MAX_CONCURRENT` | `engine.max_concurrent` |
    /// | `LINKWISE_LOG_FORMAT` | `logging.format` (`json`, anything else is pretty) |
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup, for testing without
    /// touching process state.
    #[must_use]
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("LINKWISE_DB").filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(max) = parse_env(&lookup, "LINKWISE_MAX_SUGGESTIONS") {
            self.defaults.max_suggestions = max;
        }
        if let Some(min) = parse_env(&lookup, "LINKWISE_MIN_CONFIDENCE") {
            self.defaults.min_confidence = min;
        }
        if let Some(max) = parse_env::<usize, _>(&lookup, "LINKWISE_MAX_CONCURRENT") {
            self.engine.max_concurrent = max.max(1);
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.logging.format = LogFormat::parse(&format);
        }
        self
    }

    /// Validates default options and scoring constants.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] describing the first problem.
    pub fn validate(&self) -> crate::Result<()> {
        self.defaults.validate()?;
        self.scoring.validate()?;
        if self.engine.max_concurrent == 0 {
            return Err(crate::Error::InvalidInput(
                "engine.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(path) = file.database_path {
            config.database_path = PathBuf::from(path);
        }
        if let Some(defaults) = file.defaults {
            config.defaults = defaults;
        }
        if let Some(scoring) = file.scoring {
            config.scoring = scoring;
        }
        if let Some(engine) = file.engine {
            config.engine = engine;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        },
    }
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "linkwise").map_or_else(
        || PathBuf::from(".linkwise").join("graph.db"),
        |dirs| dirs.data_dir().join("graph.db"),
    )
}
