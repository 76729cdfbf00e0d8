use std::time::Duration;

use crate::feed::fetcher::{fetch_document, FetchError};
use crate::feed::parser::parse_entries;
use crate::feed::{FeedEntry, FeedResult, FeedSource, MatchedEntry};
use crate::matcher::KeywordMatcher;
use crate::util::validate_url;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-fetch settings shared by every feed in a scan.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// End-to-end limit for one feed request.
    pub timeout: Duration,
    /// Permit loopback and private-network feed hosts.
    pub allow_private_hosts: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            allow_private_hosts: false,
        }
    }
}

/// Fetches one feed and returns the entries matching `matcher`.
///
/// Never fails: fetch, validation and parse errors become a
/// [`FeedOutcome::Failed`](crate::feed::FeedOutcome::Failed) result so that
/// the rest of the scan carries on.
pub async fn process_feed(
    client: &reqwest::Client,
    source: &FeedSource,
    matcher: &KeywordMatcher,
    options: &FetchOptions,
) -> FeedResult {
    match fetch_and_match(client, source, matcher, options).await {
        Ok(matches) => {
            tracing::debug!(feed = %source, matches = matches.len(), "Feed scanned");
            FeedResult::matched(source.clone(), matches)
        }
        Err(e) => {
            tracing::warn!(feed = %source, error = %e, "Feed fetch failed");
            FeedResult::failed(source.clone(), e.to_string())
        }
    }
}

async fn fetch_and_match(
    client: &reqwest::Client,
    source: &FeedSource,
    matcher: &KeywordMatcher,
    options: &FetchOptions,
) -> Result<Vec<MatchedEntry>, FetchError> {
    let url = validate_url(source.as_str(), options.allow_private_hosts)?;
    let bytes = fetch_document(client, &url, options.timeout).await?;

    // Parsing and matching are CPU-bound; keep them off the async workers
    let matcher = matcher.clone();
    let (entries, matches) = tokio::task::spawn_blocking(move || {
        let entries = parse_entries(&bytes)?;
        let count = entries.len();
        Ok::<_, anyhow::Error>((count, match_entries(entries, &matcher)))
    })
    .await
    .map_err(|e| FetchError::Parse(format!("parser task failed: {}", e)))?
    .map_err(|e| FetchError::Parse(e.to_string()))?;

    tracing::trace!(feed = %source, entries = entries, "Feed parsed");
    Ok(matches)
}

/// Keeps the entries whose `title + " " + summary` matched at least one rule.
pub fn match_entries(entries: Vec<FeedEntry>, matcher: &KeywordMatcher) -> Vec<MatchedEntry> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let keywords = matcher.matches(&entry.combined_text());
            MatchedEntry::new(entry, keywords)
        })
        .collect()
}
