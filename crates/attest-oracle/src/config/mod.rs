//! Configuration types for the oracle.

use crate::error::{OracleError, Result};
use crate::key::{KeyField, KeySpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Request-record fields that are always part of the key and therefore can
/// never be configured as extra request keys.
const BUILTIN_KEY_FIELDS: &[&str] = &["method", "url", "body"];

fn default_response_status() -> u16 {
    200
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Canonical case corpus files (committed augmentation included).
    #[serde(default)]
    pub compact_files: Vec<PathBuf>,

    /// Pending augmentation logs, applied over the compact base at load.
    #[serde(default)]
    pub update_files: Vec<PathBuf>,

    /// Extra key fields, in the order they participate in the key.
    #[serde(default)]
    pub request_keys: Vec<String>,

    /// Per-field defaults used when a record omits a request key field.
    #[serde(default)]
    pub request_key_defaults: HashMap<String, Value>,

    /// Status filled into exact-match responses when the stored case omits
    /// one.
    #[serde(default = "default_response_status")]
    pub default_response_status: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compact_files: Vec::new(),
            update_files: Vec::new(),
            request_keys: Vec::new(),
            request_key_defaults: HashMap::new(),
            default_response_status: default_response_status(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            OracleError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: Config = serde_yaml::from_str(&contents).map_err(|e| {
            OracleError::config(format!("cannot parse config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.compact_files.is_empty() {
            return Err(OracleError::config(
                "at least one compact case file is required",
            ));
        }
        for name in &self.request_keys {
            if BUILTIN_KEY_FIELDS.contains(&name.as_str()) {
                return Err(OracleError::config(format!(
                    "'{name}' is always part of the key and cannot be listed under requestKeys"
                )));
            }
        }
        for name in self.request_key_defaults.keys() {
            if !self.request_keys.contains(name) {
                return Err(OracleError::config(format!(
                    "requestKeyDefaults names '{name}', which is not listed under requestKeys"
                )));
            }
        }
        Ok(())
    }

    /// The key specification derived from `requestKeys` and their defaults.
    pub fn key_spec(&self) -> KeySpec {
        KeySpec::new(
            self.request_keys
                .iter()
                .map(|name| KeyField {
                    name: name.clone(),
                    default: self.request_key_defaults.get(name).cloned(),
                })
                .collect(),
        )
    }
}
