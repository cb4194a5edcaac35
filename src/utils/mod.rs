//! Utility modules supporting the harvesting pipeline.
//!
//! - [`normalize_authors`], [`normalize_venue`], [`normalize_year`]: pure field normalization
//! - [`sort_by_year_desc`]: stable newest-first ordering with configurable placement of unknown years
//! - [`deduplicate_records`]: remove repeated publications by title similarity and year
//! - [`HttpClient`]: HTTP client with optional request pacing and status mapping
//! - [`with_retry`]: bounded retry with a fixed delay on transient errors
//!
//! # Normalization
//!
//! ```rust
//! use scholar_pubs::utils::{normalize_authors, normalize_venue, normalize_year, AuthorSplit};
//!
//! assert_eq!(normalize_year("pp. 12-20, 2019"), "2019");
//! assert_eq!(normalize_venue("IEEE Trans. Computers, 2020", "2020"), "IEEE Trans. Computers");
//! assert_eq!(
//!     normalize_authors("A. Smith and B. Jones, C. Lee", AuthorSplit::AndAndComma),
//!     vec!["A. Smith", "B. Jones", "C. Lee"]
//! );
//! ```
//!
//! # Retry
//!
//! ```rust,no_run
//! use scholar_pubs::sources::SourceError;
//! use scholar_pubs::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let _data = with_retry(RetryConfig::default(), "fetch data", || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod dedup;
mod http;
mod normalize;
mod retry;
mod sort;

pub use dedup::{deduplicate_records, find_duplicates, DuplicateStrategy};
pub use http::{check_status, HttpClient};
pub use normalize::{normalize_authors, normalize_venue, normalize_year, AuthorSplit};
pub use retry::{with_retry, RetryConfig};
pub use sort::{sort_by_year_desc, year_key, UnknownYear};
