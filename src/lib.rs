//! Stateless keyword monitor for RSS/Atom feeds.
//!
//! One invocation loads the monitor configuration, scans every configured
//! feed concurrently for keyword matches and posts a single batched alert to
//! a webhook when anything matched.
//!
//! - [`matcher`] - case-insensitive keyword matching (word-boundary by default)
//! - [`feed`] - fetching, parsing and per-feed processing
//! - [`scan`] - bounded concurrent fan-out and report assembly
//! - [`alert`] - webhook payload construction and delivery
//! - [`handler`] - the invocation entrypoint tying it all together
//! - [`config`] - runtime settings and the monitor configuration document

pub mod alert;
pub mod config;
pub mod feed;
pub mod handler;
pub mod matcher;
pub mod scan;
pub mod util;

pub use alert::{dispatch, AlertPayload, DeliveryError, DispatchOutcome, Webhook};
pub use config::{ConfigLoadError, ConfigSource, MonitorConfig, Settings};
pub use feed::{FeedEntry, FeedOutcome, FeedResult, FeedSource, FetchError, MatchedEntry};
pub use handler::{run_invocation, InvocationResponse, InvocationSummary};
pub use matcher::{KeywordMatcher, MatchMode};
pub use scan::{scan_feeds, ScanOptions, ScanReport};
