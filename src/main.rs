//! Binary entrypoint: boots the digest loop.
//!
//! One cycle per configured period, forever. Each cycle collects the feeds
//! that changed since the last run, folds in the daily briefing, packages
//! the document as an EPUB and mails it to the Kindle address.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kindle_digest::config::{MailSettings, Settings};
use kindle_digest::cursor::FileCursor;
use kindle_digest::cycle::run_cycle;
use kindle_digest::deliver::mail::SmtpMailer;
use kindle_digest::ingest::feed::HttpFeedSource;
use kindle_digest::ingest::types::FeedSource;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kindle_digest=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the variables come from the runtime.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::load()?;
    let mail = MailSettings::from_env()?;
    let transport = SmtpMailer::new(&mail)?;
    let cursor = FileCursor::new(settings.cursor_path.clone());

    let client = HttpFeedSource::default_client();
    let sources: Vec<Arc<dyn FeedSource>> = settings
        .feed_urls
        .iter()
        .map(|url| Arc::new(HttpFeedSource::new(url.clone(), client.clone())) as Arc<dyn FeedSource>)
        .collect();

    info!(
        feeds = sources.len(),
        period_secs = settings.period.as_secs(),
        "kindle-digest starting"
    );

    loop {
        match run_cycle(&settings, &cursor, &sources, &transport).await {
            Ok(outcome) => info!(?outcome, "cycle finished"),
            Err(e) => error!(error = ?e, "cycle failed"),
        }
        tokio::time::sleep(settings.period).await;
    }
}
