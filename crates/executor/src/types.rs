//! Record types and invocation requests.
//!
//! Stored documents use kebab-case JSON field names. Transient inputs are
//! deserialized with every field defaulted so that an omitted field and an
//! empty one are rejected by the same validation path.

use serde::{Deserialize, Serialize};

use sealbook_core::validate_simple_key;

use crate::transient::{require_non_empty, TransientInput, TransientMap};
use crate::{Error, Result};

/// `kind` discriminator of a public [`Record`]
pub const RECORD_KIND: &str = "record";

/// `kind` discriminator of a private [`RecordDetail`]
pub const RECORD_DETAIL_KIND: &str = "record-detail";

// =============================================================================
// Stored documents
// =============================================================================

/// Public summary of a record, stored in the public partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Record {
    /// Always [`RECORD_KIND`]
    pub kind: String,
    /// Unique record name; also the storage key
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Party that created the record
    pub originator: String,
    /// Party the record is intended for
    pub recipient: String,
    /// Grouping attribute indexed by `authorization~name`
    pub authorization: String,
    /// Set once the recipient acknowledges access; never reset
    pub accessed: bool,
}

/// Sensitive detail of a record, stored in the private partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecordDetail {
    /// Always [`RECORD_DETAIL_KIND`]
    pub kind: String,
    /// Same name as the public record
    pub name: String,
    /// Where the protected content lives
    pub location: String,
    /// Key material protecting the content
    pub key_material: String,
}

// =============================================================================
// Transient inputs
// =============================================================================

/// Payload of `create-record`, passed under `"record-create"`
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CreateRecordInput {
    /// Record name
    pub name: String,
    /// Public description
    pub description: String,
    /// Originating party
    pub originator: String,
    /// Receiving party
    pub recipient: String,
    /// Grouping attribute
    pub authorization: String,
    /// Private location
    pub location: String,
    /// Private key material
    pub key_material: String,
}

impl std::fmt::Debug for CreateRecordInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateRecordInput")
            .field("name", &self.name)
            .field("authorization", &self.authorization)
            .field("location", &"<redacted>")
            .field("key_material", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl TransientInput for CreateRecordInput {
    const KEY: &'static str = "record-create";

    fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        require_non_empty("description", &self.description)?;
        require_non_empty("originator", &self.originator)?;
        require_non_empty("recipient", &self.recipient)?;
        require_non_empty("authorization", &self.authorization)?;
        require_non_empty("location", &self.location)?;
        require_non_empty("key-material", &self.key_material)?;
        validate_name(&self.name)
    }
}

impl CreateRecordInput {
    /// Public record built from this input, not yet accessed
    pub fn record(&self) -> Record {
        Record {
            kind: RECORD_KIND.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            originator: self.originator.clone(),
            recipient: self.recipient.clone(),
            authorization: self.authorization.clone(),
            accessed: false,
        }
    }

    /// Private detail built from this input
    pub fn detail(&self) -> RecordDetail {
        RecordDetail {
            kind: RECORD_DETAIL_KIND.to_string(),
            name: self.name.clone(),
            location: self.location.clone(),
            key_material: self.key_material.clone(),
        }
    }
}

/// Payload of `delete-record`, passed under `"record-delete"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeleteRecordInput {
    /// Record to delete
    pub name: String,
}

impl TransientInput for DeleteRecordInput {
    const KEY: &'static str = "record-delete";

    fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        validate_name(&self.name)
    }
}

/// Payload of `mark-accessed`, passed under `"record-access"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccessRecordInput {
    /// Record being acknowledged
    pub name: String,
}

impl TransientInput for AccessRecordInput {
    const KEY: &'static str = "record-access";

    fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        validate_name(&self.name)
    }
}

/// Reject names that cannot be stored as simple keys
pub(crate) fn validate_name(name: &str) -> Result<()> {
    validate_simple_key(name)
        .map_err(|e| Error::validation(format!("name is not a valid record name: {}", e)))
}

// =============================================================================
// Partitions and invocations
// =============================================================================

/// Logical storage partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Records and index entries
    Public,
    /// Record details
    Private,
}

/// One request naming an operation
///
/// # Example
///
/// ```
/// use sealbook_executor::Invocation;
///
/// let read = Invocation::new("read-record").arg("t1");
/// let delete = Invocation::new("delete-record")
///     .transient("record-delete", br#"{"name":"t1"}"#.to_vec());
/// assert_eq!(read.args, vec!["t1"]);
/// assert!(delete.args.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Operation name looked up in the handler table
    pub operation: String,
    /// Positional string arguments
    pub args: Vec<String>,
    /// Transaction-scoped sensitive input
    pub transient: TransientMap,
}

impl Invocation {
    /// Invocation with no arguments and no transient input
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    /// Append a positional argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace all positional arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add one transient entry
    pub fn transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(key, value);
        self
    }

    /// Replace the whole transient map
    pub fn with_transient(mut self, transient: TransientMap) -> Self {
        self.transient = transient;
        self
    }
}
