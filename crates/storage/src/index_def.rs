//! Declarative index definitions
//!
//! Index definitions are JSON files shipped alongside the record layer, one
//! directory per collection:
//!
//! ```text
//! indexes/
//!   collectionRecords/
//!     indexOriginator.json
//! ```
//!
//! Each file holds a single definition:
//!
//! ```json
//! {"index":{"fields":["kind","originator"]},"ddoc":"indexOriginatorDoc","name":"indexOriginator","type":"json"}
//! ```
//!
//! Definitions are advisory: the query engine answers the same with or
//! without them, but a query naming an unregistered design document is
//! logged.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sealbook_core::{StoreError, StoreResult};

/// Sort direction of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// One indexed field, either bare or with an explicit direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexField {
    /// `"field"`
    Name(String),
    /// `{"field": "asc"}`
    Directed(BTreeMap<String, SortDirection>),
}

impl IndexField {
    /// Field names this entry covers
    fn names(&self) -> Vec<&str> {
        match self {
            IndexField::Name(name) => vec![name.as_str()],
            IndexField::Directed(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

/// The `index` object of a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Indexed fields, in order
    pub fields: Vec<IndexField>,
}

/// A parsed index definition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Fields covered by the index
    pub index: IndexSpec,
    /// Design document holding the index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddoc: Option<String>,
    /// Index name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Index type; only `json` is accepted
    #[serde(rename = "type", default = "default_index_type")]
    pub index_type: String,
}

fn default_index_type() -> String {
    "json".to_string()
}

impl IndexDefinition {
    /// Parse and validate a definition
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIndexDefinition`] if the JSON does not
    /// describe a `json` index over at least one named field.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let definition: IndexDefinition = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidIndexDefinition(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> StoreResult<()> {
        if self.index_type != "json" {
            return Err(StoreError::InvalidIndexDefinition(format!(
                "unsupported index type '{}'",
                self.index_type
            )));
        }
        let names = self.field_names();
        if names.is_empty() {
            return Err(StoreError::InvalidIndexDefinition(
                "index has no fields".to_string(),
            ));
        }
        if names.iter().any(|n| n.is_empty()) {
            return Err(StoreError::InvalidIndexDefinition(
                "index field names must be non-empty".to_string(),
            ));
        }
        if matches!(&self.ddoc, Some(d) if d.is_empty()) {
            return Err(StoreError::InvalidIndexDefinition(
                "ddoc must be non-empty when present".to_string(),
            ));
        }
        Ok(())
    }

    /// Design document name without any `_design/` prefix
    pub fn design_doc(&self) -> Option<&str> {
        self.ddoc
            .as_deref()
            .map(|d| d.strip_prefix("_design/").unwrap_or(d))
    }

    /// Indexed field names, in order
    pub fn field_names(&self) -> Vec<&str> {
        self.index.fields.iter().flat_map(IndexField::names).collect()
    }
}

/// Load every `*.json` definition in `dir`, in file name order
///
/// # Errors
///
/// Returns [`StoreError::InvalidIndexDefinition`] if the directory cannot be
/// read or any file fails to parse.
pub fn load_index_dir(dir: &Path) -> StoreResult<Vec<IndexDefinition>> {
    let read_err = |e: std::io::Error| {
        StoreError::InvalidIndexDefinition(format!("{}: {}", dir.display(), e))
    };

    let mut paths: Vec<_> = fs::read_dir(dir)
        .map_err(read_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let json = fs::read_to_string(path).map_err(read_err)?;
            let definition = IndexDefinition::from_json(&json).map_err(|e| match e {
                StoreError::InvalidIndexDefinition(msg) => {
                    StoreError::InvalidIndexDefinition(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;
            debug!(
                target: "sealbook::storage",
                path = %path.display(),
                name = ?definition.name,
                "loaded index definition"
            );
            Ok(definition)
        })
        .collect()
}
