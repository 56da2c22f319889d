//! MEDLINE text format parser.
//!
//! `efetch` with `rettype=medline&retmode=text` returns records separated by
//! blank lines. Each field starts with a tag padded to four columns followed
//! by `"- "`; long values wrap onto lines indented by six spaces.
//!
//! ```text
//! PMID- 31452104
//! TI  - A long title that wraps
//!       onto a second line.
//! AU  - Doe J
//! AU  - Smith A
//! ```

use crate::models::{FieldMap, RawValue};

/// Tags that always produce a list, even with a single occurrence
const LIST_TAGS: &[&str] = &[
    "AD", "AID", "AU", "AUID", "CN", "FAU", "GR", "IS", "LA", "MH", "OT", "PHST", "PT", "RN", "SI",
];

/// Parse a MEDLINE text stream into one field map per record.
pub fn parse(text: &str) -> Vec<FieldMap> {
    let mut records = Vec::new();
    let mut current = RecordAccumulator::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            if let Some(record) = current.finish() {
                records.push(record);
            }
            continue;
        }

        if let Some(continuation) = line.strip_prefix("      ") {
            current.append(continuation.trim());
            continue;
        }

        match split_tag(line) {
            Some((tag, value)) => current.push(tag, value),
            None => tracing::debug!(line, "Skipping unrecognized MEDLINE line"),
        }
    }

    if let Some(record) = current.finish() {
        records.push(record);
    }

    records
}

fn split_tag(line: &str) -> Option<(&str, &str)> {
    let separator = line.get(4..6)?;
    if separator != "- " {
        return None;
    }
    let tag = line.get(..4)?.trim_end();
    if tag.is_empty() {
        return None;
    }
    Some((tag, line.get(6..).unwrap_or("").trim()))
}

#[derive(Default)]
struct RecordAccumulator {
    fields: Vec<(String, Vec<String>)>,
}

impl RecordAccumulator {
    fn push(&mut self, tag: &str, value: &str) {
        match self.fields.iter_mut().find(|(t, _)| t == tag) {
            Some((_, values)) => values.push(value.to_string()),
            None => self.fields.push((tag.to_string(), vec![value.to_string()])),
        }
    }

    fn append(&mut self, text: &str) {
        // continuation of the most recently pushed value
        if let Some(last) = self.fields.last_mut().and_then(|(_, v)| v.last_mut()) {
            if !last.is_empty() {
                last.push(' ');
            }
            last.push_str(text);
        }
    }

    fn finish(&mut self) -> Option<FieldMap> {
        if self.fields.is_empty() {
            return None;
        }

        let record = std::mem::take(&mut self.fields)
            .into_iter()
            .map(|(tag, mut values)| {
                let value = if values.len() == 1 && !LIST_TAGS.contains(&tag.as_str()) {
                    RawValue::Text(values.remove(0))
                } else {
                    RawValue::List(values)
                };
                (tag, value)
            })
            .collect();

        Some(record)
    }
}
