//! Key encoding for sealbook
//!
//! Ledger state is a flat, ordered key space per collection. Two kinds of keys
//! live in it:
//!
//! - **Simple keys**: record names, used verbatim.
//! - **Composite keys**: secondary index entries built from an index name and
//!   an ordered list of components.
//!
//! ## Composite key contract
//!
//! ```text
//! \0 <index name> \0 <component 1> \0 <component 2> \0 ...
//! ```
//!
//! Inside the index name and each component, `\u{1}` is written as
//! `\u{1}\u{2}` and `\u{0}` as `\u{1}\u{1}`, so the terminator is never
//! ambiguous. With this escaping:
//! - encoding is injective and [`split_composite_key`] inverts it
//! - the encoding of leading components is a prefix of exactly the keys that
//!   start with those components
//! - byte order of encoded keys equals lexicographic order of component tuples
//!
//! Simple keys must not start with `\0`, which keeps the two kinds disjoint and
//! places every composite key before every simple key.

use thiserror::Error;

/// First character of every composite key
pub const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';

/// Escape character used inside composite key segments
const ESCAPE: char = '\u{1}';

/// Smallest simple key; range scans starting here skip composite keys
pub const MIN_SIMPLE_KEY: &str = "\u{1}";

/// Build a composite key from an index name and at least one component
///
/// # Examples
///
/// ```
/// use sealbook_core::key::{create_composite_key, split_composite_key};
///
/// let key = create_composite_key("authorization~name", &["a1", "t1"]).unwrap();
/// assert_eq!(key, "\u{0}authorization~name\u{0}a1\u{0}t1\u{0}");
///
/// let (index, parts) = split_composite_key(&key).unwrap();
/// assert_eq!(index, "authorization~name");
/// assert_eq!(parts, vec!["a1".to_string(), "t1".to_string()]);
/// ```
pub fn create_composite_key(index_name: &str, components: &[&str]) -> Result<String, KeyError> {
    if components.is_empty() {
        return Err(KeyError::NoComponents);
    }
    partial_composite_key(index_name, components)
}

/// Build the scan prefix covering every key under the given leading components
///
/// An empty component list yields the prefix of the whole index.
pub fn partial_composite_key(index_name: &str, components: &[&str]) -> Result<String, KeyError> {
    if index_name.is_empty() {
        return Err(KeyError::EmptyIndexName);
    }

    let capacity = 2 + index_name.len() + components.iter().map(|c| c.len() + 1).sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push(COMPOSITE_KEY_NAMESPACE);
    push_segment(&mut key, index_name);
    for component in components {
        push_segment(&mut key, component);
    }
    Ok(key)
}

/// Decode a composite key into its index name and components
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), KeyError> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_NAMESPACE)
        .ok_or_else(|| KeyError::Malformed("missing composite key namespace".to_string()))?;

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            COMPOSITE_KEY_NAMESPACE => segments.push(std::mem::take(&mut current)),
            ESCAPE => match chars.next() {
                Some('\u{1}') => current.push('\u{0}'),
                Some('\u{2}') => current.push('\u{1}'),
                _ => return Err(KeyError::Malformed("invalid escape sequence".to_string())),
            },
            other => current.push(other),
        }
    }

    if !current.is_empty() {
        return Err(KeyError::Malformed("unterminated segment".to_string()));
    }

    let mut segments = segments.into_iter();
    let index_name = match segments.next() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(KeyError::EmptyIndexName),
    };
    Ok((index_name, segments.collect()))
}

/// Whether a key belongs to the composite key space
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_NAMESPACE)
}

/// Validate a simple (non-composite) key
pub fn validate_simple_key(key: &str) -> Result<(), KeyError> {
    // Rule 1: Key cannot be empty
    if key.is_empty() {
        return Err(KeyError::Empty);
    }

    // Rule 2: Key cannot collide with the composite key space
    if is_composite_key(key) {
        return Err(KeyError::ReservedPrefix);
    }

    Ok(())
}

fn push_segment(out: &mut String, segment: &str) {
    for c in segment.chars() {
        match c {
            '\u{0}' => {
                out.push(ESCAPE);
                out.push('\u{1}');
            }
            '\u{1}' => {
                out.push(ESCAPE);
                out.push('\u{2}');
            }
            other => out.push(other),
        }
    }
    out.push(COMPOSITE_KEY_NAMESPACE);
}

/// Key encoding errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Key is empty (length 0)
    #[error("key cannot be empty")]
    Empty,

    /// Simple key starts with the composite key namespace
    #[error("key cannot start with the composite key namespace (U+0000)")]
    ReservedPrefix,

    /// Composite key index name is empty
    #[error("composite key index name cannot be empty")]
    EmptyIndexName,

    /// Composite key built without any component
    #[error("composite key needs at least one component")]
    NoComponents,

    /// Composite key could not be decoded
    #[error("malformed composite key: {0}")]
    Malformed(String),
}

impl KeyError {
    /// Short machine-readable reason code
    pub fn reason_code(&self) -> &'static str {
        match self {
            KeyError::Empty => "empty_key",
            KeyError::ReservedPrefix => "reserved_prefix",
            KeyError::EmptyIndexName => "empty_index_name",
            KeyError::NoComponents => "no_components",
            KeyError::Malformed(_) => "malformed_composite_key",
        }
    }
}
