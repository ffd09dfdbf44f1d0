use std::collections::BTreeMap;

use crate::error::MarkrResult;
use crate::record::StudentRecord;

/// One test's share of an import, merged and ready to write.
#[derive(Debug, Clone)]
pub struct MergedBatch {
    pub test_id: String,
    pub raw_key: String,
    pub records: BTreeMap<String, StudentRecord>,
}

/// Per-test key/field storage for merged student records.
pub trait ResultStore {
    // Merged records, keyed by test id then student number
    fn get_results(&self, test_id: &str) -> MarkrResult<BTreeMap<String, StudentRecord>>;
    fn put_results(
        &self,
        test_id: &str,
        records: &BTreeMap<String, StudentRecord>,
    ) -> MarkrResult<()>;

    // Verbatim copies of submitted documents; never read back by the pipeline
    fn put_raw(&self, key: &str, payload: &str) -> MarkrResult<()>;

    /// Write the raw copy and merged records of every batch in one document.
    ///
    /// The default writes batch by batch, so a failure part way through
    /// leaves earlier batches stored. Stores with transactions override this
    /// to write all or nothing.
    fn put_import(&self, payload: &str, batches: &[MergedBatch]) -> MarkrResult<()> {
        for batch in batches {
            self.put_raw(&batch.raw_key, payload)?;
            self.put_results(&batch.test_id, &batch.records)?;
        }
        Ok(())
    }
}
