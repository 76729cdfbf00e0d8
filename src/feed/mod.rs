//! Feed fetching, parsing and per-feed keyword processing.
//!
//! - [`parser`] - feed bytes to [`FeedEntry`] values via the `feed-rs` crate
//! - [`fetcher`] - single-shot HTTP retrieval with timeout and size limit
//! - [`processor`] - one feed end to end, yielding a [`FeedResult`]
//!
//! # Example
//!
//! ```ignore
//! use feedwatch::feed::{process_feed, FetchOptions};
//!
//! let result = process_feed(&client, &source, &matcher, &FetchOptions::default()).await;
//! for m in result.matches() {
//!     println!("{} {:?}", m.entry().title, m.keywords());
//! }
//! ```

mod fetcher;
mod parser;
mod processor;
mod types;

pub(crate) use fetcher::read_limited_bytes;
pub use fetcher::{fetch_document, FetchError, MAX_FEED_SIZE};
pub use parser::parse_entries;
pub use processor::{match_entries, process_feed, FetchOptions, DEFAULT_FETCH_TIMEOUT};
pub use types::{FeedEntry, FeedOutcome, FeedResult, FeedSource, MatchedEntry};
