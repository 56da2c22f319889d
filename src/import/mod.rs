//! Offline import of library exports.
//!
//! The ACM Digital Library lets a search be exported as a `.bib` file. Each
//! entry becomes a [`RawRecord::Bibtex`] holding every field under its
//! lowercase name, plus the entry type as `ENTRYTYPE` and the citation key as
//! `ID`. Field values are taken verbatim with whitespace collapsed.

use biblatex::{Bibliography, ChunksExt, Entry};
use std::path::{Path, PathBuf};

use crate::models::{FieldMap, RawRecord, RawValue};

/// Errors that can occur while reading an export file
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("BibTeX parse error: {0}")]
    Parse(String),
}

fn collapse(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn entry_fields(entry: &Entry) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("ID".to_string(), RawValue::Text(entry.key.clone()));
    fields.insert(
        "ENTRYTYPE".to_string(),
        RawValue::Text(entry.entry_type.to_string().to_lowercase()),
    );

    for (name, value) in &entry.fields {
        let text = collapse(&value.format_verbatim());
        if !text.is_empty() {
            fields.insert(name.to_lowercase(), RawValue::Text(text));
        }
    }

    fields
}

/// Parse BibTeX source into one raw record per entry, in file order.
pub fn parse_bibtex(source: &str) -> Result<Vec<RawRecord>, ImportError> {
    let bibliography =
        Bibliography::parse(source).map_err(|e| ImportError::Parse(e.to_string()))?;

    Ok(bibliography
        .iter()
        .map(|entry| RawRecord::Bibtex(entry_fields(entry)))
        .collect())
}

/// Read and parse a `.bib` file
pub fn read_bibtex(path: &Path) -> Result<Vec<RawRecord>, ImportError> {
    let source = std::fs::read_to_string(path)?;
    let records = parse_bibtex(&source)?;
    tracing::info!(entries = records.len(), path = %path.display(), "Read BibTeX export");
    Ok(records)
}

/// `lit_<name>.csv` next to the input file
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bib".to_string());
    input.with_file_name(format!("lit_{}.csv", stem))
}
