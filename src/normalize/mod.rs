//! Mapping of raw source records onto the common [`Record`] schema.
//!
//! Each [`RawRecord`] variant has its own pure mapping. Absent fields, empty
//! values and values equal to the sentinel all come out as the sentinel.
//! [`Record::to_raw`] goes the other way, so a normalized record can be fed
//! back through [`normalize`] unchanged.

use serde_json::{json, Map, Value};

use crate::models::{
    is_sentinel, FieldMap, RawRecord, RawValue, Record, RecordBuilder, SourceKind,
};

const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// Map a raw record to the common schema
pub fn normalize(raw: &RawRecord) -> Record {
    match raw {
        RawRecord::Acm(fields) => normalize_acm(fields),
        RawRecord::Wos(item) => normalize_wos(item),
        RawRecord::PubMed(fields) => normalize_pubmed(fields),
        RawRecord::Bibtex(fields) => normalize_bibtex(fields),
    }
}

/// Normalize every record of a fetch, preserving order
pub fn normalize_all(raw: &[RawRecord]) -> Vec<Record> {
    raw.iter().map(normalize).collect()
}

fn text(fields: &FieldMap, key: &str) -> Option<String> {
    fields.get(key).map(RawValue::as_text)
}

fn list(fields: &FieldMap, key: &str) -> Option<Vec<String>> {
    fields.get(key).map(RawValue::as_list)
}

/// First whitespace-separated token of a value, e.g. `"2019 Aug 26"` -> `"2019"`
fn first_token(value: String) -> Option<String> {
    value.split_whitespace().next().map(str::to_string)
}

/// DOI embedded in an ACM link: `.../doi/<prefix>/<suffix>`, optionally with
/// one view segment such as `abs` or `pdf` before the prefix
fn doi_from_link(link: &str) -> Option<String> {
    let (_, path) = link.split_once("/doi/")?;
    let path = path.trim_matches('/');
    let doi = match path.split_once('/') {
        Some((view, rest)) if !view.starts_with("10.") => rest,
        _ => path,
    };
    doi.starts_with("10.").then(|| doi.to_string())
}

fn normalize_acm(fields: &FieldMap) -> Record {
    let link = text(fields, "Link").filter(|l| !is_sentinel(l));
    let doi = link.as_deref().and_then(doi_from_link);

    RecordBuilder::new(SourceKind::Acm)
        .title(text(fields, "Title"))
        .authors(list(fields, "Authors"))
        .source_title(text(fields, "Journal"))
        .publication_year(text(fields, "Year"))
        .external_id(doi.clone())
        .doi(doi)
        .url(link)
        .build()
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Values of `item[group][field]`, which the API delivers as a list
fn wos_values(item: &Map<String, Value>, group: &str, field: &str) -> Option<Vec<String>> {
    match item.get(group)?.get(field)? {
        Value::Array(values) => Some(values.iter().filter_map(json_text).collect()),
        other => json_text(other).map(|v| vec![v]),
    }
}

fn wos_first(item: &Map<String, Value>, group: &str, field: &str) -> Option<String> {
    wos_values(item, group, field)?.into_iter().next()
}

fn normalize_wos(item: &Map<String, Value>) -> Record {
    RecordBuilder::new(SourceKind::WebOfScience)
        .title(wos_first(item, "Title", "Title"))
        .authors(wos_values(item, "Author", "Authors"))
        .publication_type(wos_first(item, "Doctype", "Doctype"))
        .source_title(wos_first(item, "Source", "SourceTitle"))
        .publication_year(wos_first(item, "Source", "Published.BiblioYear"))
        .keywords(wos_values(item, "Keyword", "Keywords"))
        .external_id(item.get("UT").and_then(json_text))
        .doi(wos_first(item, "Other", "Identifier.Doi"))
        .issn(wos_first(item, "Other", "Identifier.Issn"))
        .build()
}

fn normalize_pubmed(fields: &FieldMap) -> Record {
    let pmid = text(fields, "PMID").filter(|p| !p.trim().is_empty() && !is_sentinel(p));
    let url = pmid
        .as_ref()
        .map(|p| format!("{}/{}", PUBMED_ARTICLE_URL, p.trim()));

    RecordBuilder::new(SourceKind::PubMed)
        .title(text(fields, "TI"))
        .abstract_text(text(fields, "AB"))
        .authors(list(fields, "AU"))
        .publication_type(text(fields, "PT"))
        .source_title(text(fields, "JT"))
        .publication_year(text(fields, "DP").and_then(first_token))
        .keywords(list(fields, "OT"))
        .external_id(pmid)
        .url(url)
        // "10.1000/xyz [doi]" keeps only the identifier itself
        .doi(text(fields, "LID").and_then(first_token))
        .build()
}

/// `author = {Doe, John and Smith, Anne}` lists one name per ` and `
fn bibtex_names(value: String) -> Vec<String> {
    value.split(" and ").map(str::to_string).collect()
}

fn bibtex_keywords(value: String) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

fn normalize_bibtex(fields: &FieldMap) -> Record {
    let key = text(fields, "ID");
    let source_title = text(fields, "journal")
        .filter(|j| !j.trim().is_empty())
        .or_else(|| text(fields, "booktitle"));
    let doi = text(fields, "doi")
        .filter(|d| !d.trim().is_empty())
        .or_else(|| key.clone());

    RecordBuilder::new(SourceKind::Bibtex)
        .title(text(fields, "title"))
        .abstract_text(text(fields, "abstract"))
        .authors(text(fields, "author").map(bibtex_names))
        .publication_type(text(fields, "ENTRYTYPE"))
        .source_title(source_title)
        .publication_year(text(fields, "year"))
        .keywords(text(fields, "keywords").map(bibtex_keywords))
        .external_id(key)
        .url(text(fields, "url"))
        .doi(doi)
        .issn(text(fields, "issn"))
        .build()
}

fn present(value: &str) -> Option<String> {
    (!is_sentinel(value)).then(|| value.to_string())
}

fn present_list(values: &[String]) -> Option<Vec<String>> {
    let values: Vec<String> = values.iter().filter(|v| !is_sentinel(v)).cloned().collect();
    (!values.is_empty()).then_some(values)
}

fn insert_text(fields: &mut FieldMap, key: &str, value: &str) {
    if let Some(v) = present(value) {
        fields.insert(key.to_string(), RawValue::Text(v));
    }
}

fn insert_list(fields: &mut FieldMap, key: &str, values: &[String]) {
    if let Some(v) = present_list(values) {
        fields.insert(key.to_string(), RawValue::List(v));
    }
}

fn wos_group(entries: &[(&str, Option<Vec<String>>)]) -> Value {
    let group: Map<String, Value> = entries
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), json!(v))))
        .collect();
    Value::Object(group)
}

impl Record {
    /// Express this record in its source's native raw shape.
    ///
    /// Sentinel fields are left out, so they stay absent.
    pub fn to_raw(&self) -> RawRecord {
        match self.source {
            SourceKind::Acm => {
                let mut fields = FieldMap::new();
                insert_text(&mut fields, "Title", &self.title);
                insert_list(&mut fields, "Authors", &self.authors);
                insert_text(&mut fields, "Journal", &self.source_title);
                insert_text(&mut fields, "Year", &self.publication_year);
                insert_text(&mut fields, "Link", &self.url);
                RawRecord::Acm(fields)
            }
            SourceKind::WebOfScience => {
                let single = |v: &str| present(v).map(|v| vec![v]);
                let mut item = Map::new();
                item.insert("Title".into(), wos_group(&[("Title", single(&self.title))]));
                item.insert(
                    "Author".into(),
                    wos_group(&[("Authors", present_list(&self.authors))]),
                );
                item.insert(
                    "Doctype".into(),
                    wos_group(&[("Doctype", single(&self.publication_type))]),
                );
                item.insert(
                    "Source".into(),
                    wos_group(&[
                        ("SourceTitle", single(&self.source_title)),
                        ("Published.BiblioYear", single(&self.publication_year)),
                    ]),
                );
                item.insert(
                    "Keyword".into(),
                    wos_group(&[("Keywords", present_list(&self.keywords))]),
                );
                item.insert(
                    "Other".into(),
                    wos_group(&[
                        ("Identifier.Doi", single(&self.doi)),
                        ("Identifier.Issn", single(&self.issn)),
                    ]),
                );
                if let Some(ut) = present(&self.external_id) {
                    item.insert("UT".into(), Value::String(ut));
                }
                RawRecord::Wos(item)
            }
            SourceKind::PubMed => {
                let mut fields = FieldMap::new();
                insert_text(&mut fields, "PMID", &self.external_id);
                insert_text(&mut fields, "TI", &self.title);
                insert_text(&mut fields, "AB", &self.r#abstract);
                insert_list(&mut fields, "AU", &self.authors);
                insert_text(&mut fields, "PT", &self.publication_type);
                insert_text(&mut fields, "JT", &self.source_title);
                insert_text(&mut fields, "DP", &self.publication_year);
                insert_list(&mut fields, "OT", &self.keywords);
                insert_text(&mut fields, "LID", &self.doi);
                RawRecord::PubMed(fields)
            }
            SourceKind::Bibtex => {
                let mut fields = FieldMap::new();
                insert_text(&mut fields, "ID", &self.external_id);
                insert_text(&mut fields, "ENTRYTYPE", &self.publication_type);
                insert_text(&mut fields, "title", &self.title);
                insert_text(&mut fields, "abstract", &self.r#abstract);
                if let Some(names) = present_list(&self.authors) {
                    fields.insert("author".into(), RawValue::Text(names.join(" and ")));
                }
                insert_text(&mut fields, "journal", &self.source_title);
                insert_text(&mut fields, "year", &self.publication_year);
                if let Some(keywords) = present_list(&self.keywords) {
                    fields.insert("keywords".into(), RawValue::Text(keywords.join(", ")));
                }
                insert_text(&mut fields, "url", &self.url);
                insert_text(&mut fields, "doi", &self.doi);
                insert_text(&mut fields, "issn", &self.issn);
                RawRecord::Bibtex(fields)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SENTINEL;

    fn field_map(entries: &[(&str, RawValue)]) -> FieldMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn t(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn l(items: &[&str]) -> RawValue {
        RawValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    fn sample_pubmed() -> RawRecord {
        RawRecord::PubMed(field_map(&[
            ("PMID", t("31452104")),
            ("TI", t("Indoor air sensing.")),
            ("AB", t("Background.")),
            ("AU", l(&["Doe, J.", "Smith, A."])),
            ("PT", l(&["Journal Article", "Review"])),
            ("JT", t("Sensors (Basel)")),
            ("DP", t("2019 Aug 26")),
            ("OT", l(&["air quality", "sensing"])),
            ("LID", t("10.3390/s19173687 [doi]")),
        ]))
    }

    fn sample_wos() -> RawRecord {
        let item = json!({
            "UT": "WOS:000484378200001",
            "Title": {"Title": ["Smart homes for well-being"]},
            "Author": {"Authors": ["Doe, J.", "Smith, A."]},
            "Doctype": {"Doctype": ["Article", "Proceedings Paper"]},
            "Source": {"SourceTitle": ["BUILDING AND ENVIRONMENT"], "Published.BiblioYear": [2020]},
            "Keyword": {"Keywords": ["IoT", "health"]},
            "Other": {"Identifier.Doi": ["10.1016/j.buildenv.2020.1"], "Identifier.Issn": ["0360-1323"]}
        });
        match item {
            Value::Object(map) => RawRecord::Wos(map),
            _ => unreachable!(),
        }
    }

    fn sample_acm() -> RawRecord {
        RawRecord::Acm(field_map(&[
            ("Title", t("Indoor Sensing for Health")),
            ("Authors", l(&["Doe, J.", "Smith, A."])),
            ("Journal", t("MobiSys '21")),
            ("Year", t("June 2021")),
            ("Link", t("https://dl.acm.org/doi/10.1145/3458864.3467681")),
        ]))
    }

    fn sample_bibtex() -> RawRecord {
        RawRecord::Bibtex(field_map(&[
            ("ID", t("10.1145/3458864.3467681")),
            ("ENTRYTYPE", t("inproceedings")),
            ("title", t("Indoor Sensing for Health")),
            ("author", t("Doe, John and Smith, Anne")),
            ("booktitle", t("Proceedings of MobiSys '21")),
            ("year", t("2021")),
            ("keywords", t("sensing, health")),
        ]))
    }

    #[test]
    fn test_normalize_pubmed() {
        let record = normalize(&sample_pubmed());
        assert_eq!(record.title, "Indoor air sensing.");
        assert_eq!(record.authors, vec!["Doe, J.", "Smith, A."]);
        assert_eq!(record.publication_type, "Journal Article, Review");
        assert_eq!(record.publication_year, "2019");
        assert_eq!(record.keywords, vec!["air quality", "sensing"]);
        assert_eq!(record.external_id, "31452104");
        assert_eq!(record.url, "https://pubmed.ncbi.nlm.nih.gov/31452104");
        assert_eq!(record.doi, "10.3390/s19173687");
        assert_eq!(record.issn, SENTINEL);
    }

    #[test]
    fn test_normalize_wos() {
        let record = normalize(&sample_wos());
        assert_eq!(record.title, "Smart homes for well-being");
        assert_eq!(record.authors, vec!["Doe, J.", "Smith, A."]);
        assert_eq!(record.publication_type, "Article");
        assert_eq!(record.source_title, "BUILDING AND ENVIRONMENT");
        assert_eq!(record.publication_year, "2020");
        assert_eq!(record.external_id, "WOS:000484378200001");
        assert_eq!(record.doi, "10.1016/j.buildenv.2020.1");
        assert_eq!(record.issn, "0360-1323");
        assert_eq!(record.r#abstract, SENTINEL);
        assert_eq!(record.url, SENTINEL);
    }

    #[test]
    fn test_normalize_acm() {
        let record = normalize(&sample_acm());
        assert_eq!(record.title, "Indoor Sensing for Health");
        assert_eq!(record.source_title, "MobiSys '21");
        assert_eq!(record.publication_year, "June 2021");
        assert_eq!(record.doi, "10.1145/3458864.3467681");
        assert_eq!(record.external_id, "10.1145/3458864.3467681");
        assert_eq!(record.url, "https://dl.acm.org/doi/10.1145/3458864.3467681");
    }

    #[test]
    fn test_acm_doi_from_view_links() {
        for link in [
            "https://dl.acm.org/doi/abs/10.1145/3458864.3467681",
            "https://dl.acm.org/doi/pdf/10.1145/3458864.3467681",
            "https://dl.acm.org/doi/10.1145/3458864.3467681/",
        ] {
            let raw = RawRecord::Acm(field_map(&[("Link", t(link))]));
            assert_eq!(normalize(&raw).doi, "10.1145/3458864.3467681", "{}", link);
        }

        let raw = RawRecord::Acm(field_map(&[(
            "Link",
            t("https://dl.acm.org/doi/proceedings/book"),
        )]));
        assert_eq!(normalize(&raw).doi, SENTINEL);
    }

    #[test]
    fn test_normalize_bibtex() {
        let record = normalize(&sample_bibtex());
        assert_eq!(record.title, "Indoor Sensing for Health");
        assert_eq!(record.authors, vec!["Doe, John", "Smith, Anne"]);
        assert_eq!(record.publication_type, "inproceedings");
        assert_eq!(record.source_title, "Proceedings of MobiSys '21");
        assert_eq!(record.publication_year, "2021");
        assert_eq!(record.keywords, vec!["sensing", "health"]);
        // no doi field: the citation key stands in
        assert_eq!(record.doi, "10.1145/3458864.3467681");
        assert_eq!(record.r#abstract, SENTINEL);
    }

    #[test]
    fn test_bibtex_journal_preferred_over_booktitle() {
        let raw = RawRecord::Bibtex(field_map(&[
            ("ID", t("doe2021")),
            ("journal", t("Sensors")),
            ("booktitle", t("Unused")),
            ("doi", t("10.3390/s21010001")),
        ]));
        let record = normalize(&raw);
        assert_eq!(record.source_title, "Sensors");
        assert_eq!(record.doi, "10.3390/s21010001");
        assert_eq!(record.external_id, "doe2021");
    }

    #[test]
    fn test_absent_fields_are_sentinel() {
        for raw in [
            RawRecord::Acm(FieldMap::new()),
            RawRecord::PubMed(FieldMap::new()),
            RawRecord::Wos(Map::new()),
            RawRecord::Bibtex(FieldMap::new()),
        ] {
            let record = normalize(&raw);
            assert_eq!(record, Record::new(raw.kind()));
        }
    }

    #[test]
    fn test_partial_wos_record() {
        let item = json!({"UT": "WOS:1", "Title": {}, "Author": {"Authors": []}});
        let Value::Object(map) = item else { unreachable!() };
        let record = normalize(&RawRecord::Wos(map));
        assert_eq!(record.external_id, "WOS:1");
        assert_eq!(record.title, SENTINEL);
        assert_eq!(record.authors, vec![SENTINEL]);
        assert_eq!(record.doi, SENTINEL);
    }

    #[test]
    fn test_sentinel_link_yields_no_doi() {
        let raw = RawRecord::Acm(field_map(&[("Title", t("X")), ("Link", t(SENTINEL))]));
        let record = normalize(&raw);
        assert_eq!(record.url, SENTINEL);
        assert_eq!(record.doi, SENTINEL);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            sample_acm(),
            sample_wos(),
            sample_pubmed(),
            sample_bibtex(),
            RawRecord::PubMed(field_map(&[("TI", t("Only a title"))])),
        ] {
            let once = normalize(&raw);
            let twice = normalize(&once.to_raw());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_normalize_all_preserves_order() {
        let records = normalize_all(&[sample_pubmed(), sample_acm()]);
        assert_eq!(records[0].source, SourceKind::PubMed);
        assert_eq!(records[1].source, SourceKind::Acm);
    }
}
