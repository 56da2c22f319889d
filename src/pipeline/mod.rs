//! Fetch → normalize → export, for one source at a time. A BibTeX export on
//! disk goes through the same normalize and export steps.

use std::path::Path;

use crate::export::{export_to_path, ExportError, Schema};
use crate::import::{read_bibtex, ImportError};
use crate::models::{Completion, FetchOutcome, Query, Record, SourceKind};
use crate::normalize::normalize_all;
use crate::sources::{Source, SourceError};

/// Normalized records of one fetch and how that fetch ended
#[derive(Debug, Clone)]
pub struct Harvest {
    pub source: SourceKind,
    pub records: Vec<Record>,
    pub pages: usize,
    pub completion: Completion,
}

impl Harvest {
    /// The CSV layout these records belong in
    pub fn schema(&self) -> Schema {
        Schema::for_kind(self.source)
    }

    /// Write the records to `path` with the source's schema
    pub fn write_csv(&self, path: &Path) -> Result<usize, ExportError> {
        export_to_path(&self.records, &self.schema(), path)
    }
}

/// Run a source's fetch to completion and normalize what it returned
pub async fn harvest(source: &dyn Source, query: &Query) -> Result<Harvest, SourceError> {
    let outcome = source.fetch(query).await?;

    match outcome.completion {
        Completion::Degraded { status } => tracing::warn!(
            source = source.id(),
            status = ?status,
            records = outcome.records.len(),
            "Fetch degraded, results are incomplete"
        ),
        Completion::NoMatches => tracing::info!(source = source.id(), "No matching records"),
        Completion::Exhausted => tracing::debug!(
            source = source.id(),
            records = outcome.records.len(),
            "Fetch complete"
        ),
    }

    Ok(Harvest {
        source: source.kind(),
        records: normalize_all(&outcome.records),
        pages: outcome.pages,
        completion: outcome.completion,
    })
}

/// Read a BibTeX export and normalize its entries
pub fn import_bibtex(path: &Path) -> Result<Harvest, ImportError> {
    let outcome = FetchOutcome::complete(read_bibtex(path)?, 1);

    Ok(Harvest {
        source: SourceKind::Bibtex,
        records: normalize_all(&outcome.records),
        pages: outcome.pages,
        completion: outcome.completion,
    })
}
