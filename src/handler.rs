//! One monitoring invocation: configuration, scan, alert, summary.
//!
//! Only configuration problems fail an invocation. Feed failures and webhook
//! delivery failures are reported in the summary, which is always returned
//! with status 200.
use serde::Serialize;

use crate::alert::{dispatch, DispatchOutcome, Webhook};
use crate::config::{load_monitor_config, ConfigLoadError, ConfigSource, Settings};
use crate::feed::FeedResult;
use crate::matcher::KeywordMatcher;
use crate::scan::{scan_feeds, ScanReport};

/// A failed feed as listed in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedFailure {
    pub feed: String,
    pub error: String,
}

/// Body of the invocation response.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationSummary {
    pub total_feeds_checked: usize,
    pub feeds_with_matches: usize,
    pub feeds_failed: usize,
    pub total_matches: usize,
    /// Feed alerts actually delivered: `feeds_with_matches` on success, else 0.
    pub alerts_sent: usize,
    pub delivery: DispatchOutcome,
    pub failures: Vec<FeedFailure>,
    pub details: Vec<FeedResult>,
}

impl InvocationSummary {
    pub fn new(report: ScanReport, delivery: DispatchOutcome) -> Self {
        let alerts_sent = if delivery.is_delivered() {
            report.feeds_with_matches
        } else {
            0
        };
        let failures = report
            .failures()
            .map(|r| FeedFailure {
                feed: r.source.to_string(),
                error: r.error().unwrap_or_default().to_string(),
            })
            .collect();

        Self {
            total_feeds_checked: report.feeds_checked,
            feeds_with_matches: report.feeds_with_matches,
            feeds_failed: report.feeds_failed,
            total_matches: report.total_matches,
            alerts_sent,
            delivery,
            failures,
            details: report.alerts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvocationResponse {
    pub status_code: u16,
    pub summary: InvocationSummary,
}

impl InvocationResponse {
    /// JSON-serialized summary.
    pub fn body(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.summary)
    }
}

/// Runs one invocation with the given settings.
///
/// The configuration document is loaded exactly once and the webhook is
/// called at most once, both outside the concurrent scan.
///
/// # Errors
///
/// Returns [`ConfigLoadError`] when the configuration source or webhook is
/// missing or invalid, or the configuration document cannot be loaded.
pub async fn run_invocation(
    client: &reqwest::Client,
    settings: &Settings,
) -> Result<InvocationResponse, ConfigLoadError> {
    let source = settings
        .config_source
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(ConfigSource::parse)
        .ok_or(ConfigLoadError::MissingSource)?;
    let webhook_url = settings
        .webhook_url
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConfigLoadError::MissingWebhook)?;
    let webhook = Webhook::new(
        webhook_url,
        settings.webhook_timeout(),
        settings.allow_private_hosts,
    )
    .map_err(ConfigLoadError::InvalidWebhook)?;

    let config = load_monitor_config(client, &source, settings).await?;
    let matcher = KeywordMatcher::new(&config.keywords, settings.match_mode)?;

    if config.is_noop() {
        tracing::info!(
            feeds = config.feeds.len(),
            keywords = matcher.len(),
            "Nothing to match, feeds are still fetched and counted"
        );
    }

    let report = scan_feeds(client, &config.feeds, &matcher, &settings.scan_options()).await;

    let delivery = if report.has_alerts() {
        dispatch(client, &report.alerts, &webhook).await
    } else {
        DispatchOutcome::NothingToSend
    };

    let summary = InvocationSummary::new(report, delivery);
    tracing::info!(
        checked = summary.total_feeds_checked,
        with_matches = summary.feeds_with_matches,
        failed = summary.feeds_failed,
        alerts_sent = summary.alerts_sent,
        "Invocation complete"
    );
    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Ok(pretty) = serde_json::to_string_pretty(&summary) {
            tracing::debug!(summary = %pretty, "Invocation summary");
        }
    }

    Ok(InvocationResponse {
        status_code: 200,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedEntry, MatchedEntry};

    fn report() -> ScanReport {
        let m = MatchedEntry::new(
            FeedEntry {
                title: "Ransomware hits hospital".into(),
                ..Default::default()
            },
            vec!["Ransomware".into()],
        )
        .unwrap();
        ScanReport::from_results(vec![
            FeedResult::matched("A".into(), vec![m]),
            FeedResult::failed("B".into(), "Request timed out after 30s"),
        ])
    }

    #[test]
    fn test_summary_delivered() {
        let summary = InvocationSummary::new(
            report(),
            DispatchOutcome::Delivered {
                status: 200,
                entries: 1,
            },
        );
        assert_eq!(summary.total_feeds_checked, 2);
        assert_eq!(summary.feeds_with_matches, 1);
        assert_eq!(summary.feeds_failed, 1);
        assert_eq!(summary.alerts_sent, 1);
        assert_eq!(
            summary.failures,
            vec![FeedFailure {
                feed: "B".into(),
                error: "Request timed out after 30s".into()
            }]
        );
    }

    #[test]
    fn test_summary_delivery_failed_sends_nothing() {
        let summary = InvocationSummary::new(
            report(),
            DispatchOutcome::Failed {
                error: "Webhook returned status 500: oops".into(),
            },
        );
        assert_eq!(summary.feeds_with_matches, 1);
        assert_eq!(summary.alerts_sent, 0);

        let body = serde_json::to_value(&summary).unwrap();
        assert_eq!(body["delivery"]["outcome"], "failed");
        assert_eq!(body["details"][0]["feed"], "A");
    }

    #[tokio::test]
    async fn test_missing_source_is_config_error() {
        let client = reqwest::Client::new();
        let settings = Settings {
            webhook_url: Some("https://hooks.example.com/x".into()),
            ..Settings::default()
        };
        let err = run_invocation(&client, &settings).await.unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingSource));
    }

    #[tokio::test]
    async fn test_missing_webhook_is_config_error() {
        let client = reqwest::Client::new();
        let settings = Settings {
            config_source: Some("/tmp/feedwatch.json".into()),
            ..Settings::default()
        };
        let err = run_invocation(&client, &settings).await.unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingWebhook));
    }
}
