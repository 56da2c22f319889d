//! Raw and normalized bibliographic records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder written for every field a source did not provide.
pub const SENTINEL: &str = "N/A";

/// The literature source a record came from.
///
/// Each kind also names the retrieval protocol used for it: ACM is scraped
/// page by page, Web of Science follows server-issued continuation URLs, and
/// PubMed enumerates identifiers in batches before a bulk fetch. BibTeX
/// records are read from a library export on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Acm,
    #[serde(rename = "wos")]
    WebOfScience,
    PubMed,
    #[serde(rename = "bib")]
    Bibtex,
}

impl SourceKind {
    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Acm => "ACM Digital Library",
            SourceKind::WebOfScience => "Web of Science",
            SourceKind::PubMed => "PubMed",
            SourceKind::Bibtex => "BibTeX export",
        }
    }

    /// Returns the short identifier used in file names and CLI commands
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Acm => "acm",
            SourceKind::WebOfScience => "wos",
            SourceKind::PubMed => "pubmed",
            SourceKind::Bibtex => "bib",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single untyped field value as delivered by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    List(Vec<String>),
}

impl RawValue {
    /// Scalar view: lists are joined with `", "`.
    pub fn as_text(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::List(items) => items.join(", "),
        }
    }

    /// Sequence view: a text value becomes a one-element list.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            RawValue::Text(s) => vec![s.clone()],
            RawValue::List(items) => items.clone(),
        }
    }
}

/// Flat field-name to value mapping. A missing key means the field was absent.
pub type FieldMap = BTreeMap<String, RawValue>;

/// Per-item result exactly as returned by a source, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// Fields scraped from one ACM search result list item
    Acm(FieldMap),
    /// One element of the Web of Science `Data` array, nested groups intact
    Wos(serde_json::Map<String, serde_json::Value>),
    /// One MEDLINE record keyed by its two-to-four letter tags
    PubMed(FieldMap),
    /// One BibTeX entry: lowercase field names plus `ENTRYTYPE` and `ID`
    Bibtex(FieldMap),
}

impl RawRecord {
    /// The source this record was produced by
    pub fn kind(&self) -> SourceKind {
        match self {
            RawRecord::Acm(_) => SourceKind::Acm,
            RawRecord::Wos(_) => SourceKind::WebOfScience,
            RawRecord::PubMed(_) => SourceKind::PubMed,
            RawRecord::Bibtex(_) => SourceKind::Bibtex,
        }
    }
}

/// A normalized, source-agnostic bibliographic item.
///
/// Scalar fields hold [`SENTINEL`] when the source did not provide them; list
/// fields hold a single sentinel element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub r#abstract: String,
    pub authors: Vec<String>,
    pub publication_type: String,
    pub source_title: String,
    pub publication_year: String,
    pub keywords: Vec<String>,
    /// Source-specific primary identifier (DOI, PMID, WoS accession or BibTeX key)
    pub external_id: String,
    pub url: String,
    pub doi: String,
    pub issn: String,
    pub source: SourceKind,
}

impl Record {
    /// Create a record with every field set to the sentinel
    pub fn new(source: SourceKind) -> Self {
        Self {
            title: SENTINEL.to_string(),
            r#abstract: SENTINEL.to_string(),
            authors: vec![SENTINEL.to_string()],
            publication_type: SENTINEL.to_string(),
            source_title: SENTINEL.to_string(),
            publication_year: SENTINEL.to_string(),
            keywords: vec![SENTINEL.to_string()],
            external_id: SENTINEL.to_string(),
            url: SENTINEL.to_string(),
            doi: SENTINEL.to_string(),
            issn: SENTINEL.to_string(),
            source,
        }
    }
}

/// Builder for constructing Record objects. `None` values and empty
/// strings/lists keep the sentinel.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

fn scalar(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != SENTINEL)
}

fn sequence(values: Option<Vec<String>>) -> Option<Vec<String>> {
    values
        .map(|items| {
            items
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v != SENTINEL)
                .collect::<Vec<_>>()
        })
        .filter(|items| !items.is_empty())
}

macro_rules! scalar_setter {
    ($name:ident, $field:ident) => {
        pub fn $name(mut self, value: Option<String>) -> Self {
            if let Some(v) = scalar(value) {
                self.record.$field = v;
            }
            self
        }
    };
}

impl RecordBuilder {
    pub fn new(source: SourceKind) -> Self {
        Self {
            record: Record::new(source),
        }
    }

    scalar_setter!(title, title);
    scalar_setter!(abstract_text, r#abstract);
    scalar_setter!(publication_type, publication_type);
    scalar_setter!(source_title, source_title);
    scalar_setter!(publication_year, publication_year);
    scalar_setter!(external_id, external_id);
    scalar_setter!(url, url);
    scalar_setter!(doi, doi);
    scalar_setter!(issn, issn);

    pub fn authors(mut self, authors: Option<Vec<String>>) -> Self {
        if let Some(v) = sequence(authors) {
            self.record.authors = v;
        }
        self
    }

    pub fn keywords(mut self, keywords: Option<Vec<String>>) -> Self {
        if let Some(v) = sequence(keywords) {
            self.record.keywords = v;
        }
        self
    }

    pub fn build(self) -> Record {
        self.record
    }
}

/// Whether a value is the absence placeholder.
pub fn is_sentinel(value: &str) -> bool {
    value == SENTINEL
}
