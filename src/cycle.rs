//! One cycle: collect -> brief -> assemble -> package -> gate -> deliver,
//! then advance the cursor.

use anyhow::Result;
use chrono::{FixedOffset, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::cursor::CursorStore;
use crate::deliver::{self, epub, mail::MailTransport, DeliveryOutcome};
use crate::digest::{self, DocMeta};
use crate::ingest::{self, feed::HttpFeedSource, types::FeedSource};

/// Run a single cycle. The cursor advances whatever happens past the
/// collection phase, so a failed delivery is never retried with the same
/// window; items are at-most-once by design.
pub async fn run_cycle(
    settings: &Settings,
    cursor: &dyn CursorStore,
    sources: &[Arc<dyn FeedSource>],
    transport: &dyn MailTransport,
) -> Result<DeliveryOutcome> {
    let now = Utc::now();
    let cutoff = cursor.read_cutoff();
    info!(%cutoff, sources = sources.len(), "cycle started");

    let posts = ingest::collect(sources, cutoff).await;
    info!(posts = posts.len(), "collection finished");

    let offset = FixedOffset::east_opt(settings.utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset"));
    let client = HttpFeedSource::default_client();
    let briefing = crate::briefing::build_fragment(settings, &client, now, offset).await;

    let meta = DocMeta {
        title: settings.doc_title.clone(),
        author: settings.doc_author.clone(),
    };
    let document = digest::assemble(&meta, posts, &[briefing]);

    let result = match epub::resolve_converter() {
        Ok(converter) => deliver::deliver(&document, &meta, converter.as_ref(), transport).await,
        Err(e) => Err(e),
    };

    // Mark the start of this cycle as the new reference point.
    cursor.advance(now);
    counter!("digest_cycles_total").increment(1);
    result
}
