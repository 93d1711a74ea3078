use crate::config::EngineKind;
use crate::storage::lsm::{LsmOptions, DEFAULT_FLUSH_THRESHOLD};
use crate::utils::error::{KvError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIN_FLUSH_THRESHOLD: usize = 1024;
pub const MAX_FLUSH_THRESHOLD: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub engine: EngineKind,
    pub flush_threshold_bytes: usize,
    pub compact_on_close: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            engine: EngineKind::default(),
            flush_threshold_bytes: DEFAULT_FLUSH_THRESHOLD,
            compact_on_close: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl StoreConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| KvError::ConfigError {
            message: format!("Cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| KvError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| KvError::ConfigError {
            message: format!("Bad substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("storage.data_dir", &self.storage.data_dir)?;
        validation::validate_range(
            "storage.flush_threshold_bytes",
            self.storage.flush_threshold_bytes,
            MIN_FLUSH_THRESHOLD,
            MAX_FLUSH_THRESHOLD,
        )?;
        if let Some(level) = &self.logging.level {
            validation::validate_log_level("logging.level", level)?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        Path::new(&self.storage.data_dir)
    }

    pub fn lsm_options(&self) -> LsmOptions {
        LsmOptions {
            flush_threshold_bytes: self.storage.flush_threshold_bytes,
            compact_on_close: self.storage.compact_on_close,
        }
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
