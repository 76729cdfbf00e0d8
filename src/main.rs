use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedwatch::{run_invocation, Settings};

/// Trigger wrapper for schedulers (cron, systemd timers, serverless hosts).
///
/// Every option can also come from the environment so the binary can run
/// without arguments.
#[derive(Parser, Debug)]
#[command(
    name = "feedwatch",
    version,
    about = "Scan RSS/Atom feeds for keywords and post one batched webhook alert"
)]
struct Args {
    /// Settings file (TOML)
    #[arg(long, env = "FEEDWATCH_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Monitor configuration document: http(s) URL or local JSON file
    #[arg(long, env = "FEEDWATCH_CONFIG_SOURCE", value_name = "SOURCE")]
    config_source: Option<String>,

    /// Webhook URL receiving alerts
    #[arg(long, env = "FEEDWATCH_WEBHOOK_URL", value_name = "URL", hide_env_values = true)]
    webhook_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if args.config_source.is_some() {
        settings.config_source = args.config_source;
    }
    if args.webhook_url.is_some() {
        settings.webhook_url = args.webhook_url;
    }
    tracing::debug!(settings = ?settings, "Effective settings");

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let response = run_invocation(&client, &settings)
        .await
        .context("Invocation aborted")?;

    let body = response.body().context("Failed to serialize summary")?;
    println!("{}", body);
    Ok(())
}
