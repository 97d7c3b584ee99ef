//! Query handlers.
//!
//! All query operations read the public partition only and answer in the
//! query executor's `[{"Key", "Record"}]` format.

use sealbook_core::KeyValue;

use crate::handlers::{Context, Handler};
use crate::index;
use crate::query::{collect_results, originator_query, run, serialize_results};
use crate::types::{Invocation, Partition};
use crate::{Error, Output, Result};

/// `query-records-by-originator [originator]`: canned rich query
pub(crate) struct QueryRecordsByOriginator;

impl Handler for QueryRecordsByOriginator {
    fn name(&self) -> &'static str {
        "query-records-by-originator"
    }

    fn arity(&self) -> usize {
        1
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let query = originator_query(&invocation.args[0])?;
        let log = ctx.config().log_query_results;
        Ok(Output::Payload(run(ctx.store(), Partition::Public, &query, log)?))
    }
}

/// `query-records [query]`: caller-supplied rich query, passed through as is
pub(crate) struct QueryRecords;

impl Handler for QueryRecords {
    fn name(&self) -> &'static str {
        "query-records"
    }

    fn arity(&self) -> usize {
        1
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let log = ctx.config().log_query_results;
        Ok(Output::Payload(run(
            ctx.store(),
            Partition::Public,
            &invocation.args[0],
            log,
        )?))
    }
}

/// `records-by-authorization [authorization]`: composite index scan
///
/// Needs only key range support from the backend.
pub(crate) struct RecordsByAuthorization;

impl Handler for RecordsByAuthorization {
    fn name(&self) -> &'static str {
        "records-by-authorization"
    }

    fn arity(&self) -> usize {
        1
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let authorization = &invocation.args[0];
        let store = ctx.store();
        let names = index::names_for(store, authorization)?;

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let value = store
                .get(Partition::Public, &name)?
                .ok_or_else(|| Error::Inconsistent {
                    reason: format!(
                        "index entry for '{}' under authorization '{}' has no record",
                        name, authorization
                    ),
                })?;
            results.push(KeyValue::new(name, value));
        }
        Ok(Output::Payload(serialize_results(&results)?))
    }
}

/// `records-by-range [start, end]`: public record key range
///
/// Empty `start` begins at the first record; empty `end` is unbounded.
pub(crate) struct RecordsByRange;

impl Handler for RecordsByRange {
    fn name(&self) -> &'static str {
        "records-by-range"
    }

    fn arity(&self) -> usize {
        2
    }

    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output> {
        let (start, end) = (&invocation.args[0], &invocation.args[1]);
        let results = collect_results(ctx.store().range(Partition::Public, start, end)?)?;
        Ok(Output::Payload(serialize_results(&results)?))
    }
}
