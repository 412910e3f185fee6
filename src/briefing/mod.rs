// src/briefing/mod.rs
//! Auxiliary daily-briefing data: weather, agenda, and the written summary.
//! Every fetch here is isolated; a dead API degrades the briefing, never
//! the cycle.

pub mod calendar;
pub mod summary;
pub mod weather;

use chrono::{DateTime, FixedOffset, Utc};

use crate::config::Settings;
use summary::{SummaryClient, SummaryContext};

/// Build the briefing fragment for `now`, in the order the document wants
/// it: weather and agenda folded into the summary paragraphs.
pub async fn build_fragment(
    settings: &Settings,
    client: &reqwest::Client,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    let today_local = now.with_timezone(&offset).date_naive();

    // Forecast rows are keyed by UTC dates; the agenda lives in local time.
    let weather = weather::fetch(client, settings.latitude, settings.longitude, now).await;
    let agenda = calendar::fetch_today(client, &settings.calendar_urls, today_local, offset).await;

    let summarizer = SummaryClient::new(
        client.clone(),
        settings.openai_api_key.clone(),
        settings.openai_model.clone(),
    );
    let ctx = SummaryContext {
        date_label: now.with_timezone(&offset).format("%A %-d %B %Y").to_string(),
        location: settings.location_label.clone(),
        weather: weather.as_ref(),
        agenda: &agenda,
    };
    summarizer.briefing_html(&ctx).await
}
