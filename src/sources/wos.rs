//! Web of Science Lite source implementation.
//!
//! API documentation: https://developer.clarivate.com/apis/woslite
//!
//! The first request carries the full query; every following page is
//! requested by fetching the URL the server returns in the
//! `x-paginate-by-query-id` response header. That URL already encodes the
//! query id and the next `firstRecord`, so only the API key header is sent
//! along with it.
//!
//! A failed page does not fail the search: whether the server answered with
//! an error status, the connection failed or timed out, or the body could not
//! be read, the records gathered up to that point are returned and the
//! outcome is marked degraded.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::models::{FetchOutcome, PageCursor, Query, RawRecord, SourceKind};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

const WOS_API_BASE: &str = "https://api.clarivate.com/api/woslite/";
const WOS_DATABASE_ID: &str = "WOK";
const CONTINUATION_HEADER: &str = "x-paginate-by-query-id";
const API_KEY_HEADER: &str = "X-ApiKey";

/// Web of Science Lite source
#[derive(Debug, Clone)]
pub struct WosSource {
    client: Arc<HttpClient>,
    endpoint: String,
    api_key: String,
    page_size: u32,
}

impl WosSource {
    pub fn new(api_key: impl Into<String>, config: &FetchConfig) -> Result<Self, SourceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::InvalidRequest(
                "a Web of Science API key is required".to_string(),
            ));
        }

        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(Arc::new(client), WOS_API_BASE, api_key).page_size(config.wos_page_size))
    }

    /// Create with a custom HTTP client and endpoint (for testing)
    pub fn with_client(
        client: Arc<HttpClient>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            page_size: 100,
        }
    }

    /// Records requested per page
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    fn first_page_params(&self, query: &Query) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("databaseId", WOS_DATABASE_ID.to_string()),
            ("usrQuery", query.text.clone()),
            ("count", self.page_size.to_string()),
            ("firstRecord", "1".to_string()),
        ];

        if let Some(range) = &query.date_range {
            params.push((
                "publishTimeSpan",
                format!(
                    "{}+{}",
                    range.start.format("%Y-%m-%d"),
                    range.end.format("%Y-%m-%d")
                ),
            ));
        }

        params
    }
}

#[async_trait]
impl Source for WosSource {
    fn kind(&self) -> SourceKind {
        SourceKind::WebOfScience
    }

    async fn fetch(&self, query: &Query) -> Result<FetchOutcome, SourceError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| {
            SourceError::InvalidRequest(format!("Invalid endpoint '{}': {}", self.endpoint, e))
        })?;

        let mut cursor = PageCursor::Offset {
            start: 1,
            limit: self.page_size as usize,
        };
        let mut visited = HashSet::new();
        let mut records = Vec::new();
        let mut pages = 0;

        tracing::info!(query = %query.text, "Searching Web of Science");

        loop {
            let request = match &cursor {
                PageCursor::Url(next) => self.client.get(next.as_str()),
                _ => self
                    .client
                    .get(endpoint.as_str())
                    .query(&self.first_page_params(query)),
            };

            tracing::debug!(first_record = ?cursor.first_record(), "Requesting Web of Science page");

            let response = match request
                .header(API_KEY_HEADER, &self.api_key)
                .header("Accept", "application/json")
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        pages,
                        records = records.len(),
                        "Web of Science request failed, keeping records gathered so far"
                    );
                    return Ok(FetchOutcome::degraded(records, pages, None));
                }
            };

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(
                    %status,
                    pages,
                    records = records.len(),
                    "Web of Science request failed, keeping records gathered so far"
                );
                return Ok(FetchOutcome::degraded(records, pages, Some(status.as_u16())));
            }

            let continuation = response
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());

            let body: WosResponse = match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        pages,
                        records = records.len(),
                        "Unreadable Web of Science response, keeping records gathered so far"
                    );
                    return Ok(FetchOutcome::degraded(records, pages, None));
                }
            };

            pages += 1;
            let data = body.data.unwrap_or_default();
            match &body.query_result {
                Some(result) => tracing::info!(
                    page = pages,
                    received = data.len(),
                    query_id = ?result.query_id,
                    records_searched = ?result.records_searched,
                    records_found = ?result.records_found,
                    "Fetched Web of Science page"
                ),
                None => tracing::info!(page = pages, received = data.len(), "Fetched Web of Science page"),
            }
            records.extend(data.into_iter().map(RawRecord::Wos));

            let Some(continuation) = continuation else {
                break;
            };

            let next = match endpoint.join(&continuation) {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(
                        url = %continuation,
                        error = %e,
                        "Invalid continuation URL, stopping pagination"
                    );
                    return Ok(FetchOutcome::degraded(records, pages, None));
                }
            };

            if !visited.insert(next.clone()) {
                tracing::warn!(url = %next, "Continuation URL repeated, stopping pagination");
                break;
            }

            cursor = PageCursor::Url(next);
            tracing::debug!(first_record = ?cursor.first_record(), "Following continuation URL");
        }

        tracing::info!(records = records.len(), pages, "Web of Science search finished");
        Ok(FetchOutcome::complete(records, pages))
    }
}

/// Web of Science Lite response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WosResponse {
    query_result: Option<QueryResult>,
    data: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryResult {
    #[serde(rename = "QueryID")]
    query_id: Option<u64>,
    records_searched: Option<u64>,
    records_found: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;

    fn source() -> WosSource {
        WosSource::with_client(Arc::new(HttpClient::new().unwrap()), WOS_API_BASE, "key")
    }

    #[test]
    fn test_first_page_params() {
        let query = Query::new("TS=(indoor sensing)")
            .date_range(DateRange::parse("2020-01-01", "2020-12-31").unwrap());
        let params = source().page_size(25).first_page_params(&query);

        assert!(params.contains(&("databaseId", "WOK".to_string())));
        assert!(params.contains(&("usrQuery", "TS=(indoor sensing)".to_string())));
        assert!(params.contains(&("count", "25".to_string())));
        assert!(params.contains(&("firstRecord", "1".to_string())));
        assert!(params.contains(&("publishTimeSpan", "2020-01-01+2020-12-31".to_string())));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let result = WosSource::new("  ", &FetchConfig::default());
        assert!(matches!(result, Err(SourceError::InvalidRequest(_))));
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "QueryResult": {"QueryID": 7, "RecordsSearched": 100, "RecordsFound": 2},
            "Data": [
                {"UT": "WOS:000123", "Title": {"Title": ["A"]}},
                {"UT": "WOS:000456", "Title": {"Title": ["B"]}}
            ]
        }"#;
        let response: WosResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.query_result.unwrap().records_found, Some(2));
        assert_eq!(response.data.unwrap().len(), 2);
    }

    #[test]
    fn test_response_with_null_data() {
        let json = r#"{"QueryResult": {"RecordsFound": 0}, "Data": null}"#;
        let response: WosResponse = serde_json::from_str(json).unwrap();
        assert!(response.data.is_none());
    }
}
