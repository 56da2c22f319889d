//! Search query models.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::sources::SourceError;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Inclusive calendar date range used to restrict a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting one whose start is after its end
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::InvalidRequest(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two `YYYY-MM-DD` or `YYYY/MM/DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, SourceError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Split a date into zero-padded year, month and day fields
    pub fn parts(date: NaiveDate) -> (String, String, String) {
        (
            format!("{:04}", date.year()),
            format!("{:02}", date.month()),
            format!("{:02}", date.day()),
        )
    }
}

/// Parse a single calendar date in either supported format.
pub fn parse_date(input: &str) -> Result<NaiveDate, SourceError> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .ok_or_else(|| {
            SourceError::InvalidRequest(format!(
                "invalid date '{}', expected YYYY-MM-DD or YYYY/MM/DD",
                input
            ))
        })
}

/// A source-specific search expression plus an optional date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Search expression, already written in the target source's syntax
    pub text: String,

    /// Inclusive publication date range
    pub date_range: Option<DateRange>,
}

impl Query {
    /// Create a new query with no date restriction
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            date_range: None,
        }
    }

    /// Restrict the query to a date range
    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_formats() {
        let range = DateRange::parse("2021-01-05", "2021/12/31").unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2021, 1, 5).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2021, 12, 31).unwrap());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let result = DateRange::parse("2022-01-01", "2021-01-01");
        assert!(matches!(result, Err(SourceError::InvalidRequest(_))));
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(parse_date("01-02-2020").is_err());
        assert!(parse_date("2020-13-01").is_err());
    }

    #[test]
    fn test_parts_are_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
        assert_eq!(
            DateRange::parts(date),
            ("2020".to_string(), "03".to_string(), "07".to_string())
        );
    }
}
