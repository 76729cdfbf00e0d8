use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Feed Source
// ============================================================================

/// URL identifying one configured feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FeedSource(String);

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeedSource {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for FeedSource {
    fn from(url: String) -> Self {
        Self(url)
    }
}

// ============================================================================
// Entries
// ============================================================================

/// One item from a parsed feed. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub title: String,
    /// Summary or description; not forwarded in reports.
    #[serde(skip)]
    pub summary: String,
    #[serde(rename = "url")]
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Text scanned for keywords: `title + " " + summary`.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

/// An entry together with the keywords it matched.
///
/// Only constructible with at least one keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedEntry {
    #[serde(flatten)]
    entry: FeedEntry,
    keywords: Vec<String>,
}

impl MatchedEntry {
    /// Returns `None` when `keywords` is empty.
    pub fn new(entry: FeedEntry, keywords: Vec<String>) -> Option<Self> {
        if keywords.is_empty() {
            None
        } else {
            Some(Self { entry, keywords })
        }
    }

    pub fn entry(&self) -> &FeedEntry {
        &self.entry
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

// ============================================================================
// Per-feed Results
// ============================================================================

/// Outcome of processing one feed: either its matches or why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedOutcome {
    /// Fetched and scanned; possibly no matches.
    Matches(Vec<MatchedEntry>),
    /// Fetch or parse failed; contributes no matches.
    #[serde(rename = "error")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedResult {
    #[serde(rename = "feed")]
    pub source: FeedSource,
    #[serde(flatten)]
    pub outcome: FeedOutcome,
}

impl FeedResult {
    pub fn matched(source: FeedSource, matches: Vec<MatchedEntry>) -> Self {
        Self {
            source,
            outcome: FeedOutcome::Matches(matches),
        }
    }

    pub fn failed(source: FeedSource, error: impl Into<String>) -> Self {
        Self {
            source,
            outcome: FeedOutcome::Failed(error.into()),
        }
    }

    /// Matched entries; empty for failed feeds.
    pub fn matches(&self) -> &[MatchedEntry] {
        match &self.outcome {
            FeedOutcome::Matches(matches) => matches.as_slice(),
            FeedOutcome::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            FeedOutcome::Matches(_) => None,
            FeedOutcome::Failed(e) => Some(e),
        }
    }

    pub fn has_matches(&self) -> bool {
        !self.matches().is_empty()
    }

    pub fn is_failed(&self) -> bool {
        self.error().is_some()
    }
}
