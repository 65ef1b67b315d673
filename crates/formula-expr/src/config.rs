use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid engine configuration: {field} must be at least 1")]
    Zero { field: &'static str },
}

/// Compilation limits. Fixed for the lifetime of an [`crate::Engine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    /// Longest accepted source, in bytes.
    pub max_expression_len: usize,
    /// Tallest accepted expression tree. Every operator, call and group adds a level, so a flat
    /// chain of N terms counts as N levels.
    pub max_nesting_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_expression_len: 8 * 1024,
            max_nesting_depth: 128,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_expression_len == 0 {
            return Err(ConfigError::Zero {
                field: "maxExpressionLen",
            });
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Zero {
                field: "maxNestingDepth",
            });
        }
        Ok(())
    }
}
