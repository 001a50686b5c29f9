//! Application configuration
//!
//! Settings are layered, lowest precedence first: built-in defaults, the
//! optional `config.toml` in the user config directory, environment
//! variables, then command line flags.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::extraction::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::persistence::DEFAULT_SLOT;
use crate::store::ReferencePolicy;

pub const ENV_DATA_DIR: &str = "WORKOUT_PLANNER_DATA_DIR";
pub const ENV_MODEL: &str = "WORKOUT_PLANNER_MODEL";
pub const ENV_API_KEY: &str = "WORKOUT_PLANNER_ANTHROPIC_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "ANTHROPIC_API_KEY";

const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "workout-planner", "workout-planner")
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub slot: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub reference_policy: Option<ReferencePolicy>,
}

impl ConfigFile {
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Application configuration structure
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Directory holding the persisted slot files
    pub data_dir: PathBuf,
    /// Key of the persisted slot
    pub slot: String,
    pub anthropic_api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub reference_policy: ReferencePolicy,
}

impl AppConfig {
    /// Defaults only, no file or environment
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// Build the full layered configuration
    pub fn load(verbose: u8, data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::new(verbose);

        if let Some(path) = Self::config_file_path() {
            config.merge_file_at(&path)?;
        }
        config.merge_env_vars();

        if let Some(dir) = data_dir {
            config = config.with_data_dir(dir);
        }

        debug!("Using data directory {}", config.data_dir.display());
        Ok(config)
    }

    /// Location of `config.toml`, when a home directory is known
    pub fn config_file_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn default_data_dir() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".workout-planner"))
    }

    /// Merge `path` if it exists; a missing file is not an error
    pub fn merge_file_at(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let contents = std::fs::read_to_string(path)?;
        let file = ConfigFile::parse(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        self.merge_file(file);
        Ok(())
    }

    pub fn merge_file(&mut self, file: ConfigFile) {
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(slot) = file.slot {
            self.slot = slot;
        }
        if let Some(key) = file.anthropic_api_key {
            self.anthropic_api_key = Some(key);
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(max_tokens) = file.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(max_retries) = file.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(delay) = file.retry_delay_ms {
            self.retry_delay_ms = delay;
        }
        if let Some(policy) = file.reference_policy {
            self.reference_policy = policy;
        }
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_with(|name| std::env::var(name).ok());
    }

    /// Merge variables resolved through `lookup`; empty values are ignored
    pub fn merge_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(dir) = var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(model) = var(ENV_MODEL) {
            self.model = model;
        }
        if let Some(key) = var(ENV_API_KEY).or_else(|| var(ENV_API_KEY_FALLBACK)) {
            self.anthropic_api_key = Some(key);
        }
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = dir;
        self
    }

    /// The API key, required by commands that call the model
    pub fn require_api_key(&self) -> Result<&str> {
        self.anthropic_api_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "No API key configured; set {ENV_API_KEY} or {ENV_API_KEY_FALLBACK}"
            ))
        })
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,hyper=debug,reqwest=debug",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            data_dir: Self::default_data_dir(),
            slot: DEFAULT_SLOT.to_string(),
            anthropic_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_retries: 3,
            retry_delay_ms: 1000,
            reference_policy: ReferencePolicy::default(),
        }
    }
}
