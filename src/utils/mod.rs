//! Utility modules supporting the fetchers.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a crate user agent

mod http;

pub use http::HttpClient;
