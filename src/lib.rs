//! # Scholar Pubs
//!
//! Extracts an author's publication list from a scholar profile and emits
//! one normalized JSON record per publication.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`sources`]: Acquisition strategies (structured API, headless browser,
//!   static profile pages) behind the [`Source`] trait
//! - [`parser`]: Raw unit to [`PublicationRecord`] with fallback-key field
//!   resolution
//! - [`pipeline`]: Acquire, parse, enrich, normalize, dedup and sort, with
//!   per-item failure isolation
//! - [`sink`]: Persists the final ordered records as `{"items": [...]}`
//! - [`models`]: Core data structures (PublicationRecord, AcquisitionResult, etc.)
//! - [`utils`]: Field normalization, retry, HTTP client, dedup and sorting
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal status output for the binary

pub mod config;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod sink;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{PublicationList, PublicationRecord};
pub use pipeline::{Pipeline, RunReport};
pub use sources::{connect_source, Source};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
