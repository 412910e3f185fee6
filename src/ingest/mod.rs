// src/ingest/mod.rs
pub mod feed;
pub mod types;

use crate::ingest::types::{FeedSource, Post};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_posts_parsed_total",
            "Posts parsed out of feed documents."
        );
        describe_counter!(
            "digest_posts_collected_total",
            "Posts kept after the cutoff filter, across all sources."
        );
        describe_counter!("digest_source_errors_total", "Feed fetch/parse failures.");
        describe_histogram!("digest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("digest_last_collect_ts", "Unix ts of the last collection.");
    });
}

/// Fan out one task per source, wait for every one of them, and merge.
///
/// Each task returns its own list; nothing is shared between workers, so a
/// failed or slow source only affects its own slot. A failure contributes an
/// empty list and a warn line, never an error to the caller.
pub async fn collect(sources: &[Arc<dyn FeedSource>], cutoff: DateTime<Utc>) -> Vec<Post> {
    ensure_metrics_described();

    let mut handles = Vec::with_capacity(sources.len());
    for src in sources {
        let src = Arc::clone(src);
        handles.push(tokio::spawn(async move {
            match src.fetch_since(cutoff).await {
                Ok(posts) => {
                    tracing::debug!(source = src.name(), posts = posts.len(), "source done");
                    posts
                }
                Err(e) => {
                    tracing::warn!(error = ?e, source = src.name(), "source failed");
                    counter!("digest_source_errors_total").increment(1);
                    Vec::new()
                }
            }
        }));
    }

    let mut merged = Vec::new();
    for h in handles {
        match h.await {
            Ok(mut posts) => merged.append(&mut posts),
            Err(e) => {
                tracing::warn!(error = ?e, "source task panicked");
                counter!("digest_source_errors_total").increment(1);
            }
        }
    }

    counter!("digest_posts_collected_total").increment(merged.len() as u64);
    gauge!("digest_last_collect_ts").set(Utc::now().timestamp().max(0) as f64);
    merged
}
