//! PubMed research source implementation using E-utilities API.
//!
//! Retrieval happens in three phases:
//!
//! 1. `esearch` with `retmax=0` to learn the total number of matches
//! 2. `esearch` in fixed-size batches to enumerate every matching PMID
//! 3. one `efetch` POST for the complete id list, returned as MEDLINE text
//!
//! `esearch` refuses to return more than a batch of ids per request, while
//! `efetch` accepts an arbitrarily long id list once it is known. A failure in
//! any phase aborts the fetch; an enumeration that falls short of the reported
//! total is an error rather than a silently smaller result.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::models::{FetchOutcome, PageCursor, Query, RawRecord, SourceKind};
use crate::sources::{medline, Source, SourceError};
use crate::utils::HttpClient;

/// PubMed E-utilities API base URL
const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const TOOL_NAME: &str = env!("CARGO_PKG_NAME");

/// PubMed research source
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    base_url: String,
    batch_size: usize,
    api_key: Option<String>,
    email: Option<String>,
}

impl PubMedSource {
    /// Create a new PubMed source
    pub fn new(config: &FetchConfig, api_key: Option<String>) -> Result<Self, SourceError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(Arc::new(client), EUTILS_BASE_URL)
            .batch_size(config.pubmed_batch_size)
            .api_key(api_key)
            .email(config.contact_email.clone()))
    }

    /// Create with a custom HTTP client and E-utilities base URL (for testing)
    pub fn with_client(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            batch_size: 1000,
            api_key: None,
            email: None,
        }
    }

    /// Number of ids requested per enumeration call
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// NCBI API key (raises the request rate NCBI allows)
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Contact email sent with every request, as NCBI asks of E-utilities clients
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.trim().is_empty());
        self
    }

    /// Build the search term, appending the date range as a `[dp]` clause
    fn search_term(query: &Query) -> String {
        match &query.date_range {
            Some(range) => format!(
                "{} AND ({}[dp] : {}[dp])",
                query.text,
                range.start.format("%Y/%m/%d"),
                range.end.format("%Y/%m/%d")
            ),
            None => query.text.clone(),
        }
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("tool", TOOL_NAME.to_string()),
        ];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    async fn esearch(
        &self,
        term: &str,
        retstart: Option<usize>,
        retmax: usize,
    ) -> Result<ESearchResult, SourceError> {
        let url = format!("{}/esearch.fcgi", self.base_url);

        let mut params = self.common_params();
        params.push(("term", term.to_string()));
        params.push(("retmode", "json".to_string()));
        if let Some(start) = retstart {
            params.push(("retstart", start.to_string()));
        }
        params.push(("retmax", retmax.to_string()));

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search PubMed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::transport(self.name(), response.status()));
        }

        let envelope: ESearchEnvelope = response.json().await.map_err(|e| {
            SourceError::Parse(format!("Failed to parse PubMed search response: {}", e))
        })?;

        Ok(envelope.esearchresult)
    }

    async fn efetch(&self, ids: &[String]) -> Result<String, SourceError> {
        let url = format!("{}/efetch.fcgi", self.base_url);

        let mut params = self.common_params();
        params.push(("id", ids.join(",")));
        params.push(("rettype", "medline".to_string()));
        params.push(("retmode", "text".to_string()));

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch PubMed details: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::transport(self.name(), response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::PubMed
    }

    async fn fetch(&self, query: &Query) -> Result<FetchOutcome, SourceError> {
        let term = Self::search_term(query);
        tracing::info!(%term, "Searching PubMed");

        let total = self.esearch(&term, None, 0).await?.count()?;
        tracing::info!(total, "PubMed reported matching records");

        if total == 0 {
            return Ok(FetchOutcome::no_matches());
        }

        let mut ids = Vec::with_capacity(total);
        let mut batches = 0;
        let mut cursor = PageCursor::Offset {
            start: 0,
            limit: self.batch_size,
        };

        while !cursor.is_exhausted(total) {
            let (start, limit) = match &cursor {
                PageCursor::Offset { start, limit } => (*start, *limit),
                _ => break,
            };

            let batch = self.esearch(&term, Some(start), limit).await?;
            batches += 1;
            tracing::debug!(start, received = batch.idlist.len(), "Fetched PubMed id batch");
            ids.extend(batch.idlist);

            cursor = match cursor.advance() {
                Some(next) => next,
                None => break,
            };
        }

        if ids.len() < total {
            tracing::warn!(expected = total, fetched = ids.len(), "PubMed id enumeration incomplete");
            return Err(SourceError::IncompleteEnumeration {
                expected: total,
                fetched: ids.len(),
            });
        }

        tracing::info!(ids = ids.len(), batches, "Enumerated PubMed ids, fetching records");

        let text = self.efetch(&ids).await?;
        let records: Vec<RawRecord> = medline::parse(&text)
            .into_iter()
            .map(RawRecord::PubMed)
            .collect();

        tracing::info!(records = records.len(), "PubMed fetch finished");
        Ok(FetchOutcome::complete(records, batches))
    }
}

#[derive(Debug, Deserialize)]
struct ESearchEnvelope {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

impl ESearchResult {
    fn count(&self) -> Result<usize, SourceError> {
        let count = self.count.as_deref().ok_or_else(|| {
            SourceError::Parse(format!(
                "PubMed search response has no count{}",
                self.error
                    .as_deref()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            ))
        })?;

        count
            .trim()
            .parse()
            .map_err(|e| SourceError::Parse(format!("Invalid PubMed count '{}': {}", count, e)))
    }
}
