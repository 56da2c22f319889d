//! Literature source fetchers.
//!
//! This module defines the [`Source`] trait that every fetcher implements. Each
//! source drives its own pagination protocol to completion and hands back the
//! raw records it collected together with a [`Completion`](crate::models::Completion)
//! describing how the fetch ended.
//!
//! | Source | Protocol | On a failed request |
//! |---|---|---|
//! | [`AcmSource`] | HTML result pages, zero-based page index, fixed delay | abort |
//! | [`WosSource`] | JSON pages, continuation URL in a response header | keep what was gathered |
//! | [`PubMedSource`] | count, enumerate ids in batches, bulk MEDLINE fetch | abort |
//!
//! # Feature Flags
//!
//! Individual sources can be disabled at compile time using Cargo features:
//!
//! - `acm` - Enable the ACM Digital Library scraper (default: enabled)
//! - `wos` - Enable the Web of Science Lite API client (default: enabled)
//! - `pubmed` - Enable the PubMed E-utilities client (default: enabled)

#[cfg(feature = "acm")]
mod acm;
#[cfg(feature = "pubmed")]
pub mod medline;
#[cfg(feature = "pubmed")]
mod pubmed;
#[cfg(feature = "wos")]
mod wos;

#[cfg(feature = "acm")]
pub use acm::AcmSource;
#[cfg(feature = "pubmed")]
pub use pubmed::PubMedSource;
#[cfg(feature = "wos")]
pub use wos::WosSource;

use crate::models::{FetchOutcome, Query, SourceKind};
use async_trait::async_trait;

/// The Source trait defines the interface for all literature fetchers.
///
/// A fetch issues one request at a time and runs to exhaustion, to a fatal
/// error, or (for sources that degrade) to the first failed page.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (used in file names, e.g., "acm", "pubmed")
    fn id(&self) -> &str {
        self.kind().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Which raw record shape this source produces
    fn kind(&self) -> SourceKind;

    /// Retrieve every raw record matching the query
    async fn fetch(&self, query: &Query) -> Result<FetchOutcome, SourceError>;
}

/// Errors that can occur when fetching from a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source answered with a non-success status
    #[error("{origin} returned HTTP status {status}")]
    Transport { origin: String, status: u16 },

    /// Network or connection error, including timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (JSON, HTML, MEDLINE)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Identifier enumeration stopped short of the reported total
    #[error("identifier enumeration incomplete: expected {expected} ids, fetched {fetched}")]
    IncompleteEnumeration { expected: usize, fetched: usize },

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SourceError {
    pub(crate) fn transport(origin: &str, status: reqwest::StatusCode) -> Self {
        SourceError::Transport {
            origin: origin.to_string(),
            status: status.as_u16(),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = SourceError::transport("PubMed", reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "PubMed returned HTTP status 502");
        assert!(matches!(err, SourceError::Transport { status: 502, .. }));
    }

    #[test]
    fn test_incomplete_enumeration_display() {
        let err = SourceError::IncompleteEnumeration {
            expected: 1500,
            fetched: 1000,
        };
        assert!(err.to_string().contains("expected 1500"));
    }
}
