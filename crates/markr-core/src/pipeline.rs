//! Read-merge-write and read-aggregate cycles over a [`ResultStore`].
//!
//! The store is passed in by the caller. Nothing here locks: callers that
//! share a store between threads must serialize `import_document` calls for
//! the same test if they need every update to survive.
//!
//! Every batch of a document is merged before anything is written, and the
//! writes go to the store in a single [`ResultStore::put_import`] call.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::batch::parse_document;
use crate::error::MarkrResult;
use crate::merge::merge;
use crate::record::{AggregateResult, ImportSummary, StudentRecord};
use crate::store::{MergedBatch, ResultStore};

/// Key under which the verbatim document for a test and scan date is kept.
pub fn raw_key(test_id: &str, scanned_on: NaiveDate) -> String {
    format!("{test_id}-{}-raw", scanned_on.format("%Y-%m-%d"))
}

/// Validate `xml` in full, then merge every batch it contains into the store.
///
/// Nothing is written unless the whole document validates.
pub fn import_document<S: ResultStore + ?Sized>(
    store: &S,
    xml: &str,
) -> MarkrResult<Vec<ImportSummary>> {
    let batches = parse_document(xml)?;
    debug!("import: {} batch(es) parsed", batches.len());

    let mut merged = Vec::with_capacity(batches.len());
    let mut summaries = Vec::with_capacity(batches.len());
    for batch in batches {
        let existing = store.get_results(&batch.test_id)?;
        let records = merge(existing, &batch.entries);

        summaries.push(ImportSummary {
            test_id: batch.test_id.clone(),
            entries_read: batch.entries.len(),
            students_stored: records.len(),
        });
        merged.push(MergedBatch {
            raw_key: raw_key(&batch.test_id, batch.scanned_on),
            test_id: batch.test_id,
            records,
        });
    }

    store.put_import(xml, &merged)?;
    for summary in &summaries {
        info!("imported {summary}");
    }
    Ok(summaries)
}

/// Aggregate statistics over everything stored for `test_id`.
pub fn aggregate_test<S: ResultStore + ?Sized>(
    store: &S,
    test_id: &str,
) -> MarkrResult<AggregateResult> {
    let records: Vec<StudentRecord> = store.get_results(test_id)?.into_values().collect();
    debug!("aggregate: {} record(s) for test {test_id}", records.len());
    Ok(aggregate(&records))
}
