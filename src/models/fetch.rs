//! Pagination state and fetch results.

use url::Url;

use super::RawRecord;

/// Progress through a paginated result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Zero-based page index
    Page(u32),
    /// Offset into a result set, `limit` records per request
    Offset { start: usize, limit: usize },
    /// Server-issued URL that already encodes the complete next request
    Url(Url),
}

impl PageCursor {
    /// The cursor for the following page, if it can be derived locally.
    ///
    /// URL cursors return `None`: only the server can issue the next one.
    pub fn advance(&self) -> Option<PageCursor> {
        match self {
            PageCursor::Page(index) => Some(PageCursor::Page(index + 1)),
            PageCursor::Offset { start, limit } => Some(PageCursor::Offset {
                start: start + limit,
                limit: *limit,
            }),
            PageCursor::Url(_) => None,
        }
    }

    /// Whether an offset cursor has reached the end of a result set of `total`
    pub fn is_exhausted(&self, total: usize) -> bool {
        match self {
            PageCursor::Offset { start, .. } => *start >= total,
            _ => false,
        }
    }

    /// First record position this cursor points at, when known.
    ///
    /// Continuation URLs carry it as a `firstRecord` query parameter.
    pub fn first_record(&self) -> Option<usize> {
        match self {
            PageCursor::Offset { start, .. } => Some(*start),
            PageCursor::Url(url) => url
                .query_pairs()
                .find(|(k, _)| k == "firstRecord")
                .and_then(|(_, v)| v.parse().ok()),
            PageCursor::Page(_) => None,
        }
    }
}

/// How a fetch came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every page was visited
    Exhausted,
    /// The source reported zero matches
    NoMatches,
    /// A page failed; records gathered before it were kept. `status` is
    /// `None` when the request never got a response or the body was unusable.
    Degraded { status: Option<u16> },
}

/// Records gathered by one fetch call and the way it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<RawRecord>,
    /// Number of result pages (or batches) successfully retrieved
    pub pages: usize,
    pub completion: Completion,
}

impl FetchOutcome {
    /// A fetch that ran to exhaustion
    pub fn complete(records: Vec<RawRecord>, pages: usize) -> Self {
        let completion = if records.is_empty() {
            Completion::NoMatches
        } else {
            Completion::Exhausted
        };
        Self {
            records,
            pages,
            completion,
        }
    }

    /// A fetch that learned up front there is nothing to retrieve
    pub fn no_matches() -> Self {
        Self {
            records: Vec::new(),
            pages: 0,
            completion: Completion::NoMatches,
        }
    }

    /// A fetch cut short by a failed page
    pub fn degraded(records: Vec<RawRecord>, pages: usize, status: Option<u16>) -> Self {
        Self {
            records,
            pages,
            completion: Completion::Degraded { status },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.completion, Completion::Degraded { .. })
    }
}
