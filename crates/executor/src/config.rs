//! Ledger configuration via `sealbook.toml`
//!
//! The record layer needs to know which backend collections back its two
//! partitions. Defaults match the shipped index definitions, so most
//! deployments never write a config file at all.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Config file name placed next to the shipped index definitions.
pub const CONFIG_FILE_NAME: &str = "sealbook.toml";

/// Backend collection names for the two partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Collection holding records and the authorization index
    #[serde(default = "default_public")]
    pub public: String,
    /// Collection holding record details
    #[serde(default = "default_private")]
    pub private: String,
}

fn default_public() -> String {
    "collectionRecords".to_string()
}

fn default_private() -> String {
    "collectionRecordDetails".to_string()
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            public: default_public(),
            private: default_private(),
        }
    }
}

/// Record layer configuration loaded from `sealbook.toml`.
///
/// # Example
///
/// ```toml
/// log_query_results = false
///
/// [partitions]
/// public = "collectionRecords"
/// private = "collectionRecordDetails"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Partition collection names.
    #[serde(default)]
    pub partitions: PartitionConfig,
    /// Log serialized query results at `trace` level.
    #[serde(default)]
    pub log_query_results: bool,
}

impl LedgerConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Sealbook record layer configuration
#
# Log serialized query results at trace level (default: false).
# Results include public record fields only, never record details.
log_query_results = false

# Backend collections backing the two partitions.
# The public collection also holds the authorization~name index.
[partitions]
public = "collectionRecords"
private = "collectionRecordDetails"
"#
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML or the
    /// partition names are empty or identical.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LedgerConfig = toml::from_str(content).map_err(|e| Error::Config {
            reason: format!("failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { reason } => Error::Config {
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| Error::Config {
                reason: format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: format!("failed to serialize config: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            reason: format!("failed to write config file '{}': {}", path.display(), e),
        })
    }

    /// Check partition names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either name is empty or both are equal.
    pub fn validate(&self) -> Result<()> {
        let PartitionConfig { public, private } = &self.partitions;
        if public.is_empty() || private.is_empty() {
            return Err(Error::Config {
                reason: "partition collection names must be non-empty".to_string(),
            });
        }
        if public == private {
            return Err(Error::Config {
                reason: format!(
                    "public and private partitions must use different collections (both '{}')",
                    public
                ),
            });
        }
        Ok(())
    }
}
