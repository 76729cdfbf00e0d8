//! Concurrent scan across all configured feeds.
//!
//! Each feed is processed independently through a bounded
//! `buffer_unordered` pool. The scan waits for every feed before building the
//! [`ScanReport`]; a failing feed only affects its own result.
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::feed::{process_feed, FeedResult, FeedSource, FetchOptions};
use crate::matcher::KeywordMatcher;

pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum number of feeds fetched at once. Values below 1 are treated as 1.
    pub concurrency: usize,
    pub fetch: FetchOptions,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            fetch: FetchOptions::default(),
        }
    }
}

/// Aggregate outcome of one scan.
///
/// `results` holds every feed in configuration order; `alerts` is the subset
/// with at least one matched entry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub feeds_checked: usize,
    pub feeds_with_matches: usize,
    pub feeds_failed: usize,
    pub total_matches: usize,
    pub results: Vec<FeedResult>,
    pub alerts: Vec<FeedResult>,
}

impl ScanReport {
    /// Builds the report from per-feed results, keeping their order.
    pub fn from_results(results: Vec<FeedResult>) -> Self {
        let alerts: Vec<FeedResult> = results.iter().filter(|r| r.has_matches()).cloned().collect();

        Self {
            feeds_checked: results.len(),
            feeds_with_matches: alerts.len(),
            feeds_failed: results.iter().filter(|r| r.is_failed()).count(),
            total_matches: alerts.iter().map(|r| r.matches().len()).sum(),
            results,
            alerts,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &FeedResult> {
        self.results.iter().filter(|r| r.is_failed())
    }

    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

/// Scans every source for keyword matches.
///
/// At most `options.concurrency` feeds are in flight at once, each on its
/// own tokio task; a feed task that panics is reported as a failed feed.
/// Results are collected once all feeds have finished and then restored to
/// the order of `sources`, so identical inputs produce identical reports.
pub async fn scan_feeds(
    client: &reqwest::Client,
    sources: &[FeedSource],
    matcher: &KeywordMatcher,
    options: &ScanOptions,
) -> ScanReport {
    if sources.is_empty() {
        tracing::info!("No feeds configured, nothing to scan");
        return ScanReport::default();
    }

    let concurrency = options.concurrency.max(1);
    tracing::info!(
        feeds = sources.len(),
        keywords = matcher.len(),
        mode = ?matcher.mode(),
        concurrency = concurrency,
        "Scanning feeds"
    );

    // Each feed runs as its own task; buffer_unordered only pulls (and so
    // spawns) the next feed while fewer than `concurrency` are in flight.
    let mut indexed: Vec<(usize, FeedResult)> = stream::iter(sources.iter().cloned().enumerate())
        .map(|(index, source)| {
            let task = {
                let client = client.clone();
                let matcher = matcher.clone();
                let fetch = options.fetch.clone();
                let source = source.clone();
                tokio::spawn(async move { process_feed(&client, &source, &matcher, &fetch).await })
            };
            async move {
                let result = task.await.unwrap_or_else(|e| {
                    tracing::error!(feed = %source, error = %e, "Feed task aborted");
                    FeedResult::failed(source, format!("Feed task failed: {}", e))
                });
                (index, result)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    // Completion order is arbitrary; restore configuration order
    indexed.sort_by_key(|(index, _)| *index);
    let report = ScanReport::from_results(indexed.into_iter().map(|(_, r)| r).collect());

    tracing::info!(
        checked = report.feeds_checked,
        with_matches = report.feeds_with_matches,
        failed = report.feeds_failed,
        matches = report.total_matches,
        "Scan complete"
    );

    report
}
