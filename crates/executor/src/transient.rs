//! Transient input decoding.
//!
//! Sensitive request payloads travel in a transaction-scoped key→bytes map
//! instead of the visible argument list. This module decodes one entry of
//! that map into a validated request type.
//!
//! Decoding fails with:
//! - [`Error::MissingTransientKey`] if the entry is absent
//! - [`Error::MalformedInput`] if it is empty or not JSON of the right shape
//! - [`Error::Validation`] if a required field is missing or empty
//!
//! Error messages describe where parsing failed, never what the payload
//! contained.

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::{Error, Result};

/// Transaction-scoped sensitive input
///
/// `Debug` output lists keys and sizes only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TransientMap {
    entries: BTreeMap<String, Vec<u8>>,
}

impl TransientMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(key.into(), value.into())
    }

    /// Bytes stored under `key`
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry names, in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the command-line form `{"<key>": "<base64 bytes>", ...}`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the text is not a JSON object of
    /// strings or a value is not valid base64.
    pub fn from_base64_json(json: &str) -> Result<Self> {
        let encoded: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| Error::MalformedInput {
                key: "<transient map>".to_string(),
                reason: describe_json_error(&e),
            })?;

        let mut map = Self::new();
        for (key, value) in encoded {
            let bytes = BASE64.decode(value.as_bytes()).map_err(|_| Error::MalformedInput {
                key: key.clone(),
                reason: "value is not valid base64".to_string(),
            })?;
            map.insert(key, bytes);
        }
        Ok(map)
    }
}

impl fmt::Debug for TransientMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            map.entry(key, &format_args!("<redacted {} bytes>", value.len()));
        }
        map.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for TransientMap
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// A request type carried in the transient map
pub trait TransientInput: DeserializeOwned {
    /// Transient map entry holding the JSON payload
    const KEY: &'static str;

    /// Check every required field
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first failing field.
    fn validate(&self) -> Result<()>;
}

/// Decode and validate the entry for `T`
///
/// # Errors
///
/// See the module documentation.
pub fn decode<T: TransientInput>(transient: &TransientMap) -> Result<T> {
    let raw = transient
        .get(T::KEY)
        .ok_or_else(|| Error::MissingTransientKey {
            key: T::KEY.to_string(),
        })?;
    if raw.is_empty() {
        return Err(Error::MalformedInput {
            key: T::KEY.to_string(),
            reason: "value is empty".to_string(),
        });
    }
    let input: T = serde_json::from_slice(raw).map_err(|e| Error::MalformedInput {
        key: T::KEY.to_string(),
        reason: describe_json_error(&e),
    })?;
    input.validate()?;
    Ok(input)
}

/// Fail unless `value` is non-empty
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(format!(
            "{} field must be a non-empty string",
            field
        )));
    }
    Ok(())
}

/// Location and class of a JSON error, without any input text
fn describe_json_error(e: &serde_json::Error) -> String {
    let class = match e.classify() {
        Category::Io => "read failure",
        Category::Syntax => "invalid JSON",
        Category::Data => "unexpected JSON shape",
        Category::Eof => "truncated JSON",
    };
    format!("{} at line {} column {}", class, e.line(), e.column())
}
