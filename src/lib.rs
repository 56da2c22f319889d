//! # litharvest
//!
//! Retrieves bibliographic metadata from several literature sources and
//! normalizes it into one tabular schema.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Queries, raw per-source records, normalized [`Record`]s, pagination state
//! - [`sources`]: One fetcher per source behind the [`Source`] trait
//! - [`normalize`]: Per-source mapping of raw records onto the common schema
//! - [`export`]: Fixed per-source CSV layouts
//! - [`import`]: BibTeX library exports read from disk
//! - [`pipeline`]: Fetch, normalize and export in one call
//! - [`utils`]: HTTP client
//! - [`config`]: Configuration management

pub mod config;
pub mod export;
pub mod import;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Query, RawRecord, Record};
pub use sources::{Source, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
