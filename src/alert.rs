//! Batched webhook alerts.
//!
//! All matched entries of one invocation go out in a single POST. The payload
//! uses the Slack-style `text` + `attachments` shape, which most chat
//! webhooks (Slack, Mattermost, Rocket.Chat) accept.
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::feed::{read_limited_bytes, FeedEntry, FeedResult};
use crate::util::{strip_control_chars, truncate_to_width, validate_url, UrlValidationError};

pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum display width of an attachment title.
const MAX_TITLE_WIDTH: usize = 250;
/// Maximum display width of an error response body kept for reporting.
const MAX_ERROR_BODY_WIDTH: usize = 200;
/// Error response bodies beyond this are not read.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

const ALERT_HEADER: &str = "\u{1f6a8} **Threat Intelligence Alert** \u{1f6a8}";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to serialize alert payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Webhook request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Webhook request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Webhook returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

/// Webhook endpoint.
///
/// The URL usually embeds a token, so it is held as a secret and never logged.
pub struct Webhook {
    url: SecretString,
    timeout: Duration,
}

impl Webhook {
    /// Validates `url` and wraps it.
    pub fn new(
        url: &str,
        timeout: Duration,
        allow_private_hosts: bool,
    ) -> Result<Self, UrlValidationError> {
        let parsed = validate_url(url, allow_private_hosts)?;
        Ok(Self {
            url: SecretString::from(parsed.to_string()),
            timeout,
        })
    }
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook")
            .field("url", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertPayload {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub title: String,
    pub title_link: String,
    pub text: String,
    /// Publication time as Unix seconds, when the feed supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

/// Result of a dispatch attempt. Delivery failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// No alerts, no request made.
    NothingToSend,
    Delivered { status: u16, entries: usize },
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }
}

/// Builds one payload covering every matched entry in `alerts`.
///
/// Entries are deduplicated by identity (link, or a hash of title and
/// summary when there is no link); the first occurrence wins.
pub fn build_payload(alerts: &[FeedResult]) -> AlertPayload {
    let mut seen = HashSet::new();
    let mut attachments = Vec::new();

    for alert in alerts {
        for matched in alert.matches() {
            let entry = matched.entry();
            if !seen.insert(entry_identity(entry)) {
                tracing::debug!(feed = %alert.source, link = %entry.link, "Duplicate entry skipped");
                continue;
            }

            attachments.push(Attachment {
                title: render_title(&entry.title),
                title_link: entry.link.clone(),
                text: format!(
                    "**Matched Keywords**: {}\n**Source**: {}",
                    matched.keywords().join(", "),
                    alert.source
                ),
                ts: entry.published.map(|p| p.timestamp()),
            });
        }
    }

    let feeds = alerts.iter().filter(|a| a.has_matches()).count();
    AlertPayload {
        text: format!(
            "{}\n{} matching {} across {} {}",
            ALERT_HEADER,
            attachments.len(),
            if attachments.len() == 1 { "entry" } else { "entries" },
            feeds,
            if feeds == 1 { "feed" } else { "feeds" }
        ),
        attachments,
    }
}

/// Sends one alert covering all of `alerts`, or nothing if there are none.
///
/// Never retries and never fails the caller; a delivery problem is logged
/// and returned as [`DispatchOutcome::Failed`].
pub async fn dispatch(
    client: &reqwest::Client,
    alerts: &[FeedResult],
    webhook: &Webhook,
) -> DispatchOutcome {
    if alerts.iter().all(|a| !a.has_matches()) {
        tracing::debug!("No matches, skipping webhook");
        return DispatchOutcome::NothingToSend;
    }

    let payload = build_payload(alerts);
    let entries = payload.attachments.len();

    match deliver(client, &payload, webhook).await {
        Ok(status) => {
            tracing::info!(status = status, entries = entries, "Alert delivered");
            DispatchOutcome::Delivered { status, entries }
        }
        Err(e) => {
            tracing::error!(error = %e, entries = entries, "Alert delivery failed");
            DispatchOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// Posts the payload. The timeout covers the whole exchange, including the
/// error body read on a non-2xx reply.
async fn deliver(
    client: &reqwest::Client,
    payload: &AlertPayload,
    webhook: &Webhook,
) -> Result<u16, DeliveryError> {
    let body = serde_json::to_vec(payload)?;

    tokio::time::timeout(webhook.timeout, async {
        let response = client
            .post(webhook.url.expose_secret())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = read_limited_bytes(response, MAX_ERROR_BODY_BYTES)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default();
            return Err(DeliveryError::HttpStatus {
                status: status.as_u16(),
                body: truncate_to_width(text.trim(), MAX_ERROR_BODY_WIDTH).into_owned(),
            });
        }

        Ok(status.as_u16())
    })
    .await
    .map_err(|_| DeliveryError::Timeout(webhook.timeout))?
}

fn render_title(title: &str) -> String {
    let clean = strip_control_chars(title);
    let trimmed = clean.trim();
    if trimmed.is_empty() {
        return "(untitled)".to_string();
    }
    truncate_to_width(trimmed, MAX_TITLE_WIDTH).into_owned()
}

fn entry_identity(entry: &FeedEntry) -> String {
    let link = entry.link.trim();
    if !link.is_empty() {
        return link.to_string();
    }
    let hash = Sha256::digest(format!("{}|{}", entry.title, entry.summary).as_bytes());
    format!("{:x}", hash)
}
