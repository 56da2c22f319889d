//! Core data models for queries, raw source records and normalized records.

mod fetch;
mod query;
mod record;

pub use fetch::{Completion, FetchOutcome, PageCursor};
pub use query::{parse_date, DateRange, Query};
pub use record::{
    is_sentinel, FieldMap, RawRecord, RawValue, Record, RecordBuilder, SourceKind, SENTINEL,
};
