//! Configuration for the adapter, registry, and wipe policy.
//!
//! Every section deserializes with defaults for missing fields, so an empty
//! JSON object is a valid configuration:
//!
//! ```rust
//! use promstash::config::Config;
//!
//! let config: Config = serde_json::from_str("{}").unwrap();
//! assert_eq!(config.adapter.key_prefix, "PROMETHEUS_");
//! assert_eq!(config.registry.namespace, "app");
//! assert!(!config.wipe.auto_wipe);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keys::DEFAULT_PREFIX;
use crate::registry::is_valid_metric_name;
use crate::render::RenderMode;

/// Storage adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Logical prefix of every key the adapter owns.
    pub key_prefix: String,

    /// Delete corrupted sample records found during collection.
    ///
    /// When false, corrupted records are only logged and skipped.
    pub auto_clean_corrupted: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_PREFIX.to_string(),
            auto_clean_corrupted: true,
        }
    }
}

impl AdapterConfig {
    /// Validates the adapter settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrefix`] if the prefix is empty or
    /// contains glob metacharacters, which would make the wipe pattern match
    /// foreign keys.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_prefix.is_empty() {
            return Err(ConfigError::InvalidPrefix {
                prefix: self.key_prefix.clone(),
                reason: "prefix cannot be empty".to_string(),
            });
        }

        if let Some(c) = self.key_prefix.chars().find(|c| matches!(c, '*' | '?' | '[' | ']')) {
            return Err(ConfigError::InvalidPrefix {
                prefix: self.key_prefix.clone(),
                reason: format!("prefix cannot contain glob metacharacter '{c}'"),
            });
        }

        Ok(())
    }
}

/// What the registry does when a write supplies the wrong number of label values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMismatchBehavior {
    /// Reject the write with an error.
    #[default]
    Error,
    /// Log a warning and drop the write.
    Log,
    /// Drop the write silently.
    Ignore,
}

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Prefix joined to every metric name with `_`. Empty disables it.
    pub namespace: String,

    /// Label-count validation policy for writes.
    pub label_mismatch: LabelMismatchBehavior,

    /// How the renderer handles label mismatches in stored data.
    pub render_mode: RenderMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: "app".to_string(),
            label_mismatch: LabelMismatchBehavior::default(),
            render_mode: RenderMode::default(),
        }
    }
}

impl RegistryConfig {
    /// Validates the registry settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNamespace`] if the namespace is neither
    /// empty nor a valid metric name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.namespace.is_empty() && !is_valid_metric_name(&self.namespace) {
            return Err(ConfigError::InvalidNamespace {
                namespace: self.namespace.clone(),
            });
        }
        Ok(())
    }
}

/// When a scrape should clear the store after rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WipeConfig {
    /// Wipe after every scrape.
    pub auto_wipe: bool,
    /// Allow a request parameter to trigger a wipe.
    pub param_enabled: bool,
    /// Name of the triggering parameter.
    pub param: String,
    /// Value the parameter must carry.
    pub value: String,
}

impl Default for WipeConfig {
    fn default() -> Self {
        Self {
            auto_wipe: false,
            param_enabled: true,
            param: "wipe".to_string(),
            value: "1".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage adapter settings.
    pub adapter: AdapterConfig,
    /// Registry settings.
    pub registry: RegistryConfig,
    /// Wipe policy settings.
    pub wipe: WipeConfig,
}

impl Config {
    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid
    /// JSON, or fails validation.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first section's [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.adapter.validate()?;
        self.registry.validate()
    }
}
