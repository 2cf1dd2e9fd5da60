use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// ODM behaviour switches with validation
#[derive(Clone, Debug, PartialEq, Eq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct OdmConfig {
    /// Whether deletes set the `deleted` flag instead of removing documents
    pub soft_deletes: bool,

    /// Maximum populate nesting (1-32)
    #[validate(range(
        min = 1,
        max = 32,
        message = "Max populate depth must be between 1 and 32"
    ))]
    pub max_populate_depth: usize,

    /// Reject populate names that are not relationships instead of dropping them
    pub strict_populate: bool,
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            soft_deletes: true,
            max_populate_depth: 8,
            strict_populate: false,
        }
    }
}

impl OdmConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            soft_deletes: parse_env_var("MONGER_SOFT_DELETES", "true")?,
            max_populate_depth: parse_env_var("MONGER_MAX_POPULATE_DEPTH", "8")?,
            strict_populate: parse_env_var("MONGER_STRICT_POPULATE", "false")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
