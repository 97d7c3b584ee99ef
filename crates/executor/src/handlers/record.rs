//! Record lifecycle handlers.
//!
//! Per record name: `Absent → Created → Accessed → Absent`. Create writes the
//! record, its detail and its index entry; delete removes all three using the
//! authorization read from the stored record, never from caller input.

use tracing::{debug, info};

use crate::handlers::{Context, Handler, WriteSequence};
use crate::index;
use crate::transient::decode;
use crate::types::{
    validate_name, AccessRecordInput, CreateRecordInput, DeleteRecordInput, Invocation, Partition,
    Record,
};
use crate::{Error, Output, Result};

fn not_found(what: &str, name: &str) -> Error {
    Error::NotFound {
        what: what.to_string(),
        name: name.to_string(),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::serialization(e.to_string()))
}

/// Load and decode the stored public record
fn load_record(ctx: &Context<'_>, name: &str) -> Result<Record> {
    let bytes = ctx
        .store()
        .get(Partition::Public, name)?
        .ok_or_else(|| not_found("record", name))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::serialization(format!("stored record '{}' is invalid: {}", name, e)))
}

// =============================================================================
// create-record
// =============================================================================

/// `create-record`: transient `"record-create"`
pub(crate) struct CreateRecord;

impl Handler for CreateRecord {
    fn name(&self) -> &'static str {
        "create-record"
    }

    fn arity(&self) -> usize {
        0
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let input: CreateRecordInput = decode(&invocation.transient)?;

        if ctx.store().get(Partition::Public, &input.name)?.is_some() {
            return Err(Error::AlreadyExists {
                name: input.name.clone(),
            });
        }

        let record = encode(&input.record())?;
        let detail = encode(&input.detail())?;

        let store = ctx.store_mut();
        let mut seq = WriteSequence::new(self.name(), &input.name);
        seq.step("record", store.put(Partition::Public, &input.name, record))?;
        seq.step("detail", store.put(Partition::Private, &input.name, detail))?;
        seq.step(
            "index entry",
            index::create_entry(store, &input.authorization, &input.name),
        )?;

        info!(target: "sealbook::executor", "record created");
        Ok(Output::Unit)
    }
}

// =============================================================================
// read-record / read-record-detail
// =============================================================================

/// `read-record [name]`: raw public record bytes
pub(crate) struct ReadRecord;

impl Handler for ReadRecord {
    fn name(&self) -> &'static str {
        "read-record"
    }

    fn arity(&self) -> usize {
        1
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let name = &invocation.args[0];
        validate_name(name)?;
        match ctx.store().get(Partition::Public, name)? {
            Some(bytes) => Ok(Output::Payload(bytes)),
            None => Err(not_found("record", name)),
        }
    }
}

/// `read-record-detail [name]`: raw private detail bytes
pub(crate) struct ReadRecordDetail;

impl Handler for ReadRecordDetail {
    fn name(&self) -> &'static str {
        "read-record-detail"
    }

    fn arity(&self) -> usize {
        1
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let name = &invocation.args[0];
        validate_name(name)?;
        match ctx.store().get(Partition::Private, name)? {
            Some(bytes) => Ok(Output::Payload(bytes)),
            None => Err(not_found("record detail", name)),
        }
    }
}

// =============================================================================
// mark-accessed
// =============================================================================

/// `mark-accessed`: transient `"record-access"`
///
/// Rewrites only the public record. Already-accessed records are left alone.
pub(crate) struct MarkAccessed;

impl Handler for MarkAccessed {
    fn name(&self) -> &'static str {
        "mark-accessed"
    }

    fn arity(&self) -> usize {
        0
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let input: AccessRecordInput = decode(&invocation.transient)?;
        let mut record = load_record(ctx, &input.name)?;

        if record.accessed {
            debug!(target: "sealbook::executor", "record already accessed");
            return Ok(Output::Unit);
        }

        record.accessed = true;
        let bytes = encode(&record)?;
        ctx.store_mut().put(Partition::Public, &input.name, bytes)?;
        info!(target: "sealbook::executor", "record marked accessed");
        Ok(Output::Unit)
    }
}

// =============================================================================
// delete-record
// =============================================================================

/// `delete-record`: transient `"record-delete"`
///
/// Deletes the record, then its index entry, then its detail.
pub(crate) struct DeleteRecord;

impl Handler for DeleteRecord {
    fn name(&self) -> &'static str {
        "delete-record"
    }

    fn arity(&self) -> usize {
        0
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let input: DeleteRecordInput = decode(&invocation.transient)?;
        let record = load_record(ctx, &input.name)?;

        let store = ctx.store_mut();
        let mut seq = WriteSequence::new(self.name(), &input.name);
        seq.step("record", store.delete(Partition::Public, &input.name))?;
        seq.step(
            "index entry",
            index::delete_entry(store, &record.authorization, &input.name),
        )?;
        seq.step("detail", store.delete(Partition::Private, &input.name))?;

        info!(target: "sealbook::executor", "record deleted");
        Ok(Output::Unit)
    }
}
