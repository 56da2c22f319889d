//! CSV export of normalized records.
//!
//! Every source has its own fixed column set, column order and list
//! delimiters. Downstream spreadsheets depend on them, so they are declared
//! here once and never derived from the [`Record`] layout.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{DateRange, Record, SourceKind};

/// Column layout and delimiters of one source's CSV output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub kind: SourceKind,
    pub columns: &'static [&'static str],
    pub author_delimiter: &'static str,
    pub keyword_delimiter: &'static str,
}

pub const ACM_SCHEMA: Schema = Schema {
    kind: SourceKind::Acm,
    columns: &["Title", "Authors", "Journal", "Year", "Link"],
    author_delimiter: ", ",
    keyword_delimiter: ", ",
};

pub const PUBMED_SCHEMA: Schema = Schema {
    kind: SourceKind::PubMed,
    columns: &[
        "Title",
        "Abstract",
        "Authors",
        "Publication Type",
        "SourceTitle",
        "Publication Year",
        "Keywords",
        "PMID",
        "URL",
        "DOI",
    ],
    author_delimiter: "; ",
    keyword_delimiter: ", ",
};

pub const WOS_SCHEMA: Schema = Schema {
    kind: SourceKind::WebOfScience,
    columns: &[
        "Title",
        "Authors",
        "Publication Type",
        "SourceTitle",
        "Publication Year",
        "Keywords",
        "UT",
        "DOI",
        "ISSN",
    ],
    author_delimiter: "; ",
    keyword_delimiter: ", ",
};

pub const BIBTEX_SCHEMA: Schema = Schema {
    kind: SourceKind::Bibtex,
    columns: &[
        "Title",
        "Abstract",
        "Authors",
        "Publication Type",
        "SourceTitle",
        "Publication Year",
        "Keywords",
        "DOI",
    ],
    author_delimiter: " and ",
    keyword_delimiter: ", ",
};

impl Schema {
    /// The schema a source's records are exported with
    pub fn for_kind(kind: SourceKind) -> Schema {
        match kind {
            SourceKind::Acm => ACM_SCHEMA,
            SourceKind::WebOfScience => WOS_SCHEMA,
            SourceKind::PubMed => PUBMED_SCHEMA,
            SourceKind::Bibtex => BIBTEX_SCHEMA,
        }
    }

    /// Cells of one record, in column order
    pub fn row(&self, record: &Record) -> Vec<String> {
        let authors = record.authors.join(self.author_delimiter);
        let keywords = record.keywords.join(self.keyword_delimiter);

        match self.kind {
            SourceKind::Acm => vec![
                record.title.clone(),
                authors,
                record.source_title.clone(),
                record.publication_year.clone(),
                record.url.clone(),
            ],
            SourceKind::PubMed => vec![
                record.title.clone(),
                record.r#abstract.clone(),
                authors,
                record.publication_type.clone(),
                record.source_title.clone(),
                record.publication_year.clone(),
                keywords,
                record.external_id.clone(),
                record.url.clone(),
                record.doi.clone(),
            ],
            SourceKind::WebOfScience => vec![
                record.title.clone(),
                authors,
                record.publication_type.clone(),
                record.source_title.clone(),
                record.publication_year.clone(),
                keywords,
                record.external_id.clone(),
                record.doi.clone(),
                record.issn.clone(),
            ],
            SourceKind::Bibtex => vec![
                record.title.clone(),
                record.r#abstract.clone(),
                authors,
                record.publication_type.clone(),
                record.source_title.clone(),
                record.publication_year.clone(),
                keywords,
                record.doi.clone(),
            ],
        }
    }
}

/// Errors that can occur while writing CSV output
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write a header row and one row per record, in input order.
///
/// Returns the number of data rows written.
pub fn export<W: Write>(
    records: &[Record],
    schema: &Schema,
    destination: W,
) -> Result<usize, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(destination);

    writer.write_record(schema.columns)?;
    for record in records {
        writer.write_record(schema.row(record))?;
    }
    writer.flush()?;

    Ok(records.len())
}

/// Export to a file, creating its parent directory if needed
pub fn export_to_path(
    records: &[Record],
    schema: &Schema,
    path: &Path,
) -> Result<usize, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let rows = export(records, schema, File::create(path)?)?;
    tracing::info!(rows, path = %path.display(), "Wrote CSV export");
    Ok(rows)
}

/// Conventional output file name for a source and optional date range
pub fn default_file_name(kind: SourceKind, range: Option<&DateRange>) -> PathBuf {
    let name = match (kind, range) {
        (SourceKind::Acm, Some(r)) => format!(
            "lit_acm_{}_{}.csv",
            r.start.format("%Y-%m-%d"),
            r.end.format("%Y-%m-%d")
        ),
        (SourceKind::Acm, None) => "lit_acm.csv".to_string(),
        (SourceKind::PubMed, Some(r)) => format!(
            "lit_pubmed_{}_{}.csv",
            r.start.format("%Y%m%d"),
            r.end.format("%Y%m%d")
        ),
        (SourceKind::PubMed, None) => "lit_pubmed.csv".to_string(),
        (SourceKind::WebOfScience, Some(r)) => format!(
            "lit_WOK_{}_{}.csv",
            r.start.format("%Y-%m-%d"),
            r.end.format("%Y-%m-%d")
        ),
        (SourceKind::WebOfScience, None) => "lit_wos.csv".to_string(),
        (SourceKind::Bibtex, _) => "lit_bib.csv".to_string(),
    };
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordBuilder, SENTINEL};
    use tempfile::tempdir;

    fn record(kind: SourceKind, title: &str) -> Record {
        RecordBuilder::new(kind)
            .title(Some(title.to_string()))
            .authors(Some(vec!["Doe, J.".to_string(), "Smith, A.".to_string()]))
            .keywords(Some(vec!["iot".to_string(), "health".to_string()]))
            .build()
    }

    fn export_string(records: &[Record], schema: &Schema) -> String {
        let mut out = Vec::new();
        export(records, schema, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn read_rows(csv_text: &str) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(csv_text.as_bytes())
            .records()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_header_matches_schema_exactly() {
        for schema in [ACM_SCHEMA, PUBMED_SCHEMA, WOS_SCHEMA, BIBTEX_SCHEMA] {
            let rows = read_rows(&export_string(&[], &schema));
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].iter().collect::<Vec<_>>(), schema.columns);
        }
    }

    #[test]
    fn test_row_count_and_order() {
        let records: Vec<Record> = (0..5)
            .map(|i| record(SourceKind::PubMed, &format!("Paper {}", i)))
            .collect();
        let rows = read_rows(&export_string(&records, &PUBMED_SCHEMA));

        assert_eq!(rows.len(), records.len() + 1);
        for (i, row) in rows.iter().skip(1).enumerate() {
            assert_eq!(&row[0], format!("Paper {}", i));
            assert_eq!(row.len(), PUBMED_SCHEMA.columns.len());
        }
    }

    #[test]
    fn test_author_delimiters_per_source() {
        let pubmed = read_rows(&export_string(
            &[record(SourceKind::PubMed, "T")],
            &PUBMED_SCHEMA,
        ));
        assert_eq!(&pubmed[1][2], "Doe, J.; Smith, A.");
        assert_eq!(&pubmed[1][6], "iot, health");

        let acm = read_rows(&export_string(&[record(SourceKind::Acm, "T")], &ACM_SCHEMA));
        assert_eq!(&acm[1][1], "Doe, J., Smith, A.");

        let wos = read_rows(&export_string(
            &[record(SourceKind::WebOfScience, "T")],
            &WOS_SCHEMA,
        ));
        assert_eq!(&wos[1][1], "Doe, J.; Smith, A.");

        let bib = read_rows(&export_string(
            &[record(SourceKind::Bibtex, "T")],
            &BIBTEX_SCHEMA,
        ));
        assert_eq!(&bib[1][2], "Doe, J. and Smith, A.");
        assert_eq!(&bib[1][7], SENTINEL);
    }

    #[test]
    fn test_sentinel_cells() {
        let rows = read_rows(&export_string(
            &[Record::new(SourceKind::WebOfScience)],
            &WOS_SCHEMA,
        ));
        assert!(rows[1].iter().all(|cell| cell == SENTINEL));
    }

    #[test]
    fn test_export_to_path_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("literature").join("lit_acm.csv");
        let rows = export_to_path(&[record(SourceKind::Acm, "T")], &ACM_SCHEMA, &path).unwrap();

        assert_eq!(rows, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Title,Authors,Journal,Year,Link"));
    }

    #[test]
    fn test_default_file_names() {
        let range = DateRange::parse("2020-01-01", "2020-12-31").unwrap();
        assert_eq!(
            default_file_name(SourceKind::PubMed, Some(&range)),
            PathBuf::from("lit_pubmed_20200101_20201231.csv")
        );
        assert_eq!(
            default_file_name(SourceKind::WebOfScience, Some(&range)),
            PathBuf::from("lit_WOK_2020-01-01_2020-12-31.csv")
        );
        assert_eq!(
            default_file_name(SourceKind::Acm, None),
            PathBuf::from("lit_acm.csv")
        );
    }
}
