//! Configuration loading and management

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{ConfigError, MultiFormResult};

/// Default limit for buffered request bodies (2 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Handler signatures and request limits declared in YAML
///
/// ```yaml
/// body_limit: 1048576
/// handlers:
///   store_person:
///     - name_request
///     - age_request
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiFormConfig {
    /// Handler name -> form request names, in declaration order
    #[serde(default)]
    pub handlers: IndexMap<String, Vec<String>>,

    /// Maximum buffered body size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_limit: Option<usize>,
}

impl MultiFormConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> MultiFormResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::IoError {
                message: e.to_string(),
            },
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> MultiFormResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Combine several configurations
    ///
    /// Later configurations replace handler entries of earlier ones and a
    /// later body limit wins.
    pub fn merge(configs: Vec<Self>) -> Self {
        let mut merged = Self::default();
        for config in configs {
            merged.handlers.extend(config.handlers);
            if config.body_limit.is_some() {
                merged.body_limit = config.body_limit;
            }
        }
        merged
    }

    /// Effective body limit
    pub fn body_limit(&self) -> usize {
        self.body_limit.unwrap_or(DEFAULT_BODY_LIMIT)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.body_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "body_limit".to_string(),
                value: "0".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        for (handler, descriptors) in &self.handlers {
            if let Some(blank) = descriptors.iter().find(|d| d.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("handlers.{}", handler),
                    value: blank.clone(),
                    message: "form request names cannot be blank".to_string(),
                });
            }
        }
        Ok(())
    }
}
