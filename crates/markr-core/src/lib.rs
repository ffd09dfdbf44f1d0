pub mod aggregate;
pub mod batch;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod record;
pub mod store;

pub use aggregate::aggregate;
pub use batch::parse_document;
pub use error::{MarkrError, MarkrResult};
pub use merge::merge;
pub use pipeline::{aggregate_test, import_document, raw_key};
pub use record::{AggregateResult, ImportSummary, RawEntry, ResultBatch, StudentRecord};
pub use store::{MergedBatch, ResultStore};
