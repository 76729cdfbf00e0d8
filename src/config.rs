//! Runtime settings and the monitor configuration document.
//!
//! Two layers:
//!
//! - [`Settings`] - optional TOML file with operational knobs (where the
//!   monitor configuration lives, webhook, concurrency, timeouts). A missing
//!   file yields `Settings::default()`.
//! - [`MonitorConfig`] - the JSON document listing `feeds` and `keywords`,
//!   loaded once per invocation from a URL or a local path.
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::alert::DEFAULT_WEBHOOK_TIMEOUT;
use crate::feed::{fetch_document, FeedSource, FetchError, FetchOptions, DEFAULT_FETCH_TIMEOUT};
use crate::matcher::{MatchError, MatchMode};
use crate::scan::{ScanOptions, DEFAULT_CONCURRENCY};
use crate::util::{validate_url, UrlValidationError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings file too large: {0}")]
    TooLarge(String),
}

/// Fatal errors: without a usable configuration there is nothing to scan.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Invalid settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("No configuration source set")]
    MissingSource,

    #[error("No webhook URL set")]
    MissingWebhook,

    #[error("Invalid webhook URL: {0}")]
    InvalidWebhook(#[source] UrlValidationError),

    #[error("Invalid configuration URL: {0}")]
    InvalidSourceUrl(#[source] UrlValidationError),

    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch configuration: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration document too large: {0} bytes")]
    TooLarge(u64),

    #[error("Configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration must be a JSON object")]
    NotAnObject,

    #[error("Invalid keyword: {0}")]
    InvalidRule(#[from] MatchError),
}

// ============================================================================
// Runtime Settings
// ============================================================================

/// Operational settings for one invocation.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The webhook URL is masked in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the monitor configuration document lives: `http(s)://` URL or file path.
    pub config_source: Option<String>,

    /// Webhook receiving the batched alert.
    pub webhook_url: Option<String>,

    /// Maximum number of feeds fetched at once.
    pub concurrency: usize,

    /// Per-feed (and configuration fetch) timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Webhook POST timeout in seconds.
    pub webhook_timeout_secs: u64,

    pub match_mode: MatchMode,

    /// Permit loopback/private-network feed, configuration and webhook hosts.
    pub allow_private_hosts: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_source: None,
            webhook_url: None,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            webhook_timeout_secs: DEFAULT_WEBHOOK_TIMEOUT.as_secs(),
            match_mode: MatchMode::default(),
            allow_private_hosts: false,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("config_source", &self.config_source)
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("webhook_timeout_secs", &self.webhook_timeout_secs)
            .field("match_mode", &self.match_mode)
            .field("allow_private_hosts", &self.allow_private_hosts)
            .finish()
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "config_source",
        "webhook_url",
        "concurrency",
        "fetch_timeout_secs",
        "webhook_timeout_secs",
        "match_mode",
        "allow_private_hosts",
    ];

    /// Reads settings from a TOML file.
    ///
    /// A missing or blank file gives the defaults. Unknown keys are logged
    /// and ignored so older settings files keep working.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut content = String::new();
        file.take(Self::MAX_FILE_SIZE + 1)
            .read_to_string(&mut content)?;
        if content.len() as u64 > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} exceeds {} bytes",
                path.display(),
                Self::MAX_FILE_SIZE
            )));
        }
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let table: toml::Table = content.parse()?;
        let unknown: Vec<&str> = table
            .keys()
            .map(String::as_str)
            .filter(|key| !Self::KNOWN_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(path = %path.display(), keys = ?unknown, "Ignoring unknown settings keys");
        }

        let settings: Settings = toml::Value::Table(table).try_into()?;
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs.max(1))
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            concurrency: self.concurrency.max(1),
            fetch: FetchOptions {
                timeout: self.fetch_timeout(),
                allow_private_hosts: self.allow_private_hosts,
            },
        }
    }
}

// ============================================================================
// Monitor Configuration
// ============================================================================

/// Where to load the monitor configuration from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Url(String),
    File(PathBuf),
}

impl ConfigSource {
    /// `http://` and `https://` values are URLs; anything else is a path.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let lower = value.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ConfigSource::Url(value.to_string())
        } else {
            ConfigSource::File(PathBuf::from(value))
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Url(url) => f.write_str(url),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The feeds to scan and the keywords to scan them for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorConfig {
    pub feeds: Vec<FeedSource>,
    pub keywords: Vec<String>,
}

impl MonitorConfig {
    /// Maximum configuration document size (1 MB).
    const MAX_DOCUMENT_SIZE: usize = 1_048_576;

    /// Parses `{"feeds": [...], "keywords": [...]}`.
    ///
    /// The document must be a JSON object. A missing or non-array field
    /// becomes an empty list, non-string items and blank strings are skipped.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigLoadError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let object = value.as_object().ok_or(ConfigLoadError::NotAnObject)?;

        Ok(Self {
            feeds: string_list(object, "feeds")
                .into_iter()
                .map(FeedSource::from)
                .collect(),
            keywords: string_list(object, "keywords"),
        })
    }

    /// True when there is nothing to scan or nothing to scan for.
    pub fn is_noop(&self) -> bool {
        self.feeds.is_empty() || self.keywords.is_empty()
    }
}

fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    match object.get(key) {
        None | Some(Value::Null) => {
            tracing::debug!(key = key, "Configuration field missing, using empty list");
            Vec::new()
        }
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item.as_str() {
                Some(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(_) => None,
                None => {
                    tracing::warn!(key = key, item = %item, "Ignoring non-string configuration item");
                    None
                }
            })
            .collect(),
        Some(other) => {
            tracing::warn!(key = key, value = %other, "Configuration field is not a list, using empty list");
            Vec::new()
        }
    }
}

/// Loads the monitor configuration once.
///
/// URLs are fetched with a single GET bounded by `settings.fetch_timeout()`;
/// paths are read from disk. Any failure is fatal for the invocation.
pub async fn load_monitor_config(
    client: &reqwest::Client,
    source: &ConfigSource,
    settings: &Settings,
) -> Result<MonitorConfig, ConfigLoadError> {
    let bytes = match source {
        ConfigSource::Url(raw) => {
            let url: Url = validate_url(raw, settings.allow_private_hosts)
                .map_err(ConfigLoadError::InvalidSourceUrl)?;
            fetch_document(client, &url, settings.fetch_timeout()).await?
        }
        ConfigSource::File(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| ConfigLoadError::Io {
                    path: path.clone(),
                    source,
                })?
        }
    };

    if bytes.len() > MonitorConfig::MAX_DOCUMENT_SIZE {
        return Err(ConfigLoadError::TooLarge(bytes.len() as u64));
    }

    let config = MonitorConfig::from_json(&bytes)?;
    tracing::info!(
        source = %source,
        feeds = config.feeds.len(),
        keywords = config.keywords.len(),
        "Loaded monitor configuration"
    );
    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_file(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("file");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.concurrency, 5);
        assert_eq!(settings.fetch_timeout_secs, 30);
        assert_eq!(settings.webhook_timeout_secs, 10);
        assert_eq!(settings.match_mode, MatchMode::WordBoundary);
        assert!(!settings.allow_private_hosts);
        assert!(settings.config_source.is_none());
    }

    #[test]
    fn test_missing_settings_file_returns_default() {
        let path = Path::new("/tmp/feedwatch_test_nonexistent_settings.toml");
        let settings = Settings::load(path).unwrap();
        assert_eq!(settings.concurrency, 5);
    }

    #[test]
    fn test_whitespace_settings_file_returns_default() {
        let (dir, path) = temp_file("feedwatch_settings_test_blank", "  \n ");
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.concurrency, 5);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_settings() {
        let content = r#"
config_source = "https://bucket.example.com/rss_feeds_and_keywords.json"
webhook_url = "https://hooks.slack.com/services/T/B/secret"
concurrency = 8
fetch_timeout_secs = 12
webhook_timeout_secs = 3
match_mode = "substring"
allow_private_hosts = true
"#;
        let (dir, path) = temp_file("feedwatch_settings_test_full", content);
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.concurrency, 8);
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(12));
        assert_eq!(settings.webhook_timeout(), Duration::from_secs(3));
        assert_eq!(settings.match_mode, MatchMode::Substring);
        assert!(settings.allow_private_hosts);

        let options = settings.scan_options();
        assert_eq!(options.concurrency, 8);
        assert!(options.fetch.allow_private_hosts);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = temp_file("feedwatch_settings_test_invalid", "this is not [valid toml");
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_oversized_settings_file_rejected() {
        let content = format!("# {}\n", "x".repeat(Settings::MAX_FILE_SIZE as usize));
        let (dir, path) = temp_file("feedwatch_settings_test_large", &content);
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let (dir, path) = temp_file(
            "feedwatch_settings_test_unknown",
            "concurrency = 2\ntheme = \"dark\"\n",
        );
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.concurrency, 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_match_mode_rejected() {
        let (dir, path) = temp_file("feedwatch_settings_test_mode", "match_mode = \"fuzzy\"\n");
        assert!(Settings::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_concurrency_clamped() {
        let settings = Settings {
            concurrency: 0,
            ..Settings::default()
        };
        assert_eq!(settings.scan_options().concurrency, 1);
    }

    #[test]
    fn test_debug_masks_webhook_url() {
        let settings = Settings {
            webhook_url: Some("https://hooks.slack.com/services/T/B/super-secret".into()),
            ..Settings::default()
        };
        let debug_output = format!("{:?}", settings);
        assert!(!debug_output.contains("super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_config_source_parse() {
        assert_eq!(
            ConfigSource::parse("https://bucket.example.com/c.json"),
            ConfigSource::Url("https://bucket.example.com/c.json".into())
        );
        assert_eq!(
            ConfigSource::parse("/etc/feedwatch/config.json"),
            ConfigSource::File(PathBuf::from("/etc/feedwatch/config.json"))
        );
    }

    #[test]
    fn test_monitor_config_from_json() {
        let json = br#"{"feeds": ["https://a.example/rss", "https://b.example/rss"], "keywords": ["Ransomware", "Zero-Day"]}"#;
        let config = MonitorConfig::from_json(json).unwrap();
        assert_eq!(
            config.feeds,
            vec![
                FeedSource::new("https://a.example/rss"),
                FeedSource::new("https://b.example/rss")
            ]
        );
        assert_eq!(config.keywords, vec!["Ransomware", "Zero-Day"]);
    }

    #[test]
    fn test_monitor_config_lenient_fields() {
        let json = br#"{"feeds": "not a list", "keywords": ["ok", 42, "", null, " padded "]}"#;
        let config = MonitorConfig::from_json(json).unwrap();
        assert!(config.feeds.is_empty());
        assert_eq!(config.keywords, vec!["ok", "padded"]);
        assert!(config.is_noop());

        let config = MonitorConfig::from_json(b"{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_monitor_config_malformed() {
        assert!(matches!(
            MonitorConfig::from_json(b"{not json"),
            Err(ConfigLoadError::Json(_))
        ));
        assert!(matches!(
            MonitorConfig::from_json(b"[1, 2]"),
            Err(ConfigLoadError::NotAnObject)
        ));
    }

    #[tokio::test]
    async fn test_load_monitor_config_from_file() {
        let (dir, path) = temp_file(
            "feedwatch_monitor_test_file",
            r#"{"feeds": ["https://a.example/rss"], "keywords": ["Indonesia"]}"#,
        );
        let client = reqwest::Client::new();
        let config = load_monitor_config(&client, &ConfigSource::File(path), &Settings::default())
            .await
            .unwrap();
        assert_eq!(config.keywords, vec!["Indonesia"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_load_monitor_config_missing_file() {
        let client = reqwest::Client::new();
        let source = ConfigSource::File(PathBuf::from("/tmp/feedwatch_no_such_config.json"));
        let err = load_monitor_config(&client, &source, &Settings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_monitor_config_from_url() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"feeds": ["https://a.example/rss"], "keywords": []}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let settings = Settings {
            allow_private_hosts: true,
            ..Settings::default()
        };
        let source = ConfigSource::Url(format!("{}/config.json", mock_server.uri()));
        let client = reqwest::Client::new();
        let config = load_monitor_config(&client, &source, &settings).await.unwrap();
        assert_eq!(config.feeds.len(), 1);
        assert!(config.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_load_monitor_config_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let settings = Settings {
            allow_private_hosts: true,
            ..Settings::default()
        };
        let source = ConfigSource::Url(format!("{}/config.json", mock_server.uri()));
        let client = reqwest::Client::new();
        let err = load_monitor_config(&client, &source, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Fetch(FetchError::HttpStatus(403))));
    }
}
