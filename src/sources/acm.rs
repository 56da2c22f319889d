//! ACM Digital Library source implementation.
//!
//! The digital library has no open search API, so result pages of
//! `/action/doSearch` are scraped one at a time. Pages are requested strictly
//! in order with a fixed pause between them; the search ends when a page no
//! longer offers a "next" pagination button.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::models::{
    DateRange, FetchOutcome, FieldMap, PageCursor, Query, RawRecord, RawValue, SourceKind,
    SENTINEL,
};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

const ACM_BASE_URL: &str = "https://dl.acm.org";
const ACM_SEARCH_PATH: &str = "/action/doSearch";
const ACM_CONTENT_TYPE: &str = "research-article";

/// ACM Digital Library source
#[derive(Debug, Clone)]
pub struct AcmSource {
    client: Arc<HttpClient>,
    base_url: String,
    page_size: u32,
    page_delay: Duration,
}

impl AcmSource {
    pub fn new(config: &FetchConfig) -> Result<Self, SourceError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(Arc::new(client), ACM_BASE_URL)
            .page_size(config.acm_page_size)
            .page_delay(Duration::from_millis(config.page_delay_ms)))
    }

    /// Create with a custom HTTP client and site origin (for testing)
    pub fn with_client(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: 50,
            page_delay: Duration::from_secs(1),
        }
    }

    /// Results requested per page
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fixed pause between successive page requests
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    fn search_params(&self, query: &Query, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![("AllField", query.text.clone())];

        if let Some(range) = &query.date_range {
            let (year, month, day) = DateRange::parts(range.start);
            params.push(("AfterYear", year));
            params.push(("AfterMonth", month));
            params.push(("AfterDay", day));
            let (year, month, day) = DateRange::parts(range.end);
            params.push(("BeforeYear", year));
            params.push(("BeforeMonth", month));
            params.push(("BeforeDay", day));
        }

        params.push(("ContentItemType", ACM_CONTENT_TYPE.to_string()));
        params.push(("pageSize", self.page_size.to_string()));
        params.push(("startPage", page.to_string()));
        params
    }
}

#[async_trait]
impl Source for AcmSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Acm
    }

    async fn fetch(&self, query: &Query) -> Result<FetchOutcome, SourceError> {
        let url = format!("{}{}", self.base_url, ACM_SEARCH_PATH);
        let mut records = Vec::new();
        let mut pages = 0;
        let mut cursor = PageCursor::Page(0);

        tracing::info!(query = %query.text, "Searching ACM Digital Library");

        loop {
            let page = match &cursor {
                PageCursor::Page(page) => *page,
                _ => break,
            };

            let params = self.search_params(query, page);
            tracing::debug!(page, "Requesting ACM result page");

            let response = self
                .client
                .get(&url)
                .query(&params)
                .header("Accept", "text/html")
                .send()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to search ACM: {}", e)))?;

            if !response.status().is_success() {
                tracing::warn!(page, status = %response.status(), "ACM page request failed");
                return Err(SourceError::transport(self.name(), response.status()));
            }

            let html = response
                .text()
                .await
                .map_err(|e| SourceError::Network(format!("Failed to read HTML: {}", e)))?;

            let results = parse_results_page(&html, &self.base_url)?;
            pages += 1;
            tracing::debug!(page, items = results.records.len(), "Parsed ACM result page");
            records.extend(results.records);

            if !results.has_next {
                break;
            }

            tokio::time::sleep(self.page_delay).await;
            cursor = match cursor.advance() {
                Some(next) => next,
                None => break,
            };
        }

        tracing::info!(records = records.len(), pages, "ACM search finished");
        Ok(FetchOutcome::complete(records, pages))
    }
}

/// Items parsed from one result page
#[derive(Debug)]
struct ResultsPage {
    records: Vec<RawRecord>,
    has_next: bool,
}

struct ItemSelectors {
    item: Selector,
    title: Selector,
    author: Selector,
    journal: Selector,
    year: Selector,
    link: Selector,
    next: Selector,
}

impl ItemSelectors {
    fn new() -> Result<Self, SourceError> {
        Ok(Self {
            item: selector("div.issue-item")?,
            title: selector("span.hlFld-Title")?,
            author: selector("span.hlFld-ContribAuthor")?,
            journal: selector("span.epub-section__title")?,
            year: selector("span.epub-section__date")?,
            link: selector("a.issue-item__title")?,
            next: selector("a.pagination__btn--next")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|e| SourceError::Parse(format!("Invalid selector '{}': {}", css, e)))
}

/// Collapse an element's text to single-spaced, trimmed form
fn element_text(elem: &ElementRef) -> String {
    elem.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(item: &ElementRef, selector: &Selector) -> RawValue {
    item.select(selector)
        .next()
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty())
        .map(RawValue::Text)
        .unwrap_or_else(|| RawValue::Text(SENTINEL.to_string()))
}

fn absolute_link(origin: &str, href: &str) -> String {
    Url::parse(origin)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", origin, href))
}

fn parse_item(item: &ElementRef, selectors: &ItemSelectors, origin: &str) -> RawRecord {
    let mut fields = FieldMap::new();

    fields.insert("Title".to_string(), first_text(item, &selectors.title));

    let authors: Vec<String> = item
        .select(&selectors.author)
        .map(|a| element_text(&a))
        .filter(|a| !a.is_empty())
        .collect();
    let authors = if authors.is_empty() {
        RawValue::Text(SENTINEL.to_string())
    } else {
        RawValue::List(authors)
    };
    fields.insert("Authors".to_string(), authors);

    fields.insert("Journal".to_string(), first_text(item, &selectors.journal));
    fields.insert("Year".to_string(), first_text(item, &selectors.year));

    let link = item
        .select(&selectors.link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| absolute_link(origin, href))
        .unwrap_or_else(|| SENTINEL.to_string());
    fields.insert("Link".to_string(), RawValue::Text(link));

    RawRecord::Acm(fields)
}

fn parse_results_page(html: &str, origin: &str) -> Result<ResultsPage, SourceError> {
    let selectors = ItemSelectors::new()?;
    let document = Html::parse_document(html);

    let records = document
        .select(&selectors.item)
        .map(|item| parse_item(&item, &selectors, origin))
        .collect();
    let has_next = document.select(&selectors.next).next().is_some();

    Ok(ResultsPage { records, has_next })
}
