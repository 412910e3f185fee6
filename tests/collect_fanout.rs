// tests/collect_fanout.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

use kindle_digest::digest::{assemble, DocMeta};
use kindle_digest::ingest::collect;
use kindle_digest::ingest::types::{FeedSource, Post};

fn post(link: &str, published: DateTime<Utc>) -> Post {
    Post {
        title: Some(format!("Post {link}")),
        author: None,
        source_name: Some("Mock".into()),
        published,
        link: link.to_string(),
        body: Some("<p>body</p>".into()),
    }
}

struct OkSource {
    posts: Vec<Post>,
    delay: Duration,
}

#[async_trait]
impl FeedSource for OkSource {
    async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>> {
        tokio::time::sleep(self.delay).await;
        Ok(self
            .posts
            .iter()
            .filter(|p| p.published > cutoff)
            .cloned()
            .collect())
    }
    fn name(&self) -> &str {
        "ok-source"
    }
}

struct FailingSource;

#[async_trait]
impl FeedSource for FailingSource {
    async fn fetch_since(&self, _cutoff: DateTime<Utc>) -> Result<Vec<Post>> {
        Err(anyhow!("connection refused"))
    }
    fn name(&self) -> &str {
        "failing-source"
    }
}

#[tokio::test]
async fn all_sources_failing_returns_empty_without_hanging() {
    let sources: Vec<Arc<dyn FeedSource>> = vec![
        Arc::new(FailingSource),
        Arc::new(FailingSource),
        Arc::new(FailingSource),
    ];
    let merged = tokio::time::timeout(Duration::from_secs(5), collect(&sources, Utc::now()))
        .await
        .expect("collect must return even when every source fails");
    assert!(merged.is_empty());
}

#[tokio::test]
async fn broken_source_does_not_block_its_siblings() {
    let t = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
    let cutoff = t - ChronoDuration::hours(1);

    let sources: Vec<Arc<dyn FeedSource>> = vec![
        Arc::new(OkSource {
            posts: vec![post("/a", t), post("/b", t + ChronoDuration::minutes(5))],
            delay: Duration::from_millis(50),
        }),
        Arc::new(FailingSource),
        Arc::new(OkSource {
            posts: vec![post("/c", t)],
            delay: Duration::ZERO,
        }),
    ];

    let merged = collect(&sources, cutoff).await;
    assert_eq!(merged.len(), 3);
}

#[tokio::test]
async fn cutoff_is_strict_and_applied_per_source() {
    let cutoff = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
    let sources: Vec<Arc<dyn FeedSource>> = vec![Arc::new(OkSource {
        posts: vec![
            post("/old", cutoff - ChronoDuration::minutes(1)),
            post("/exact", cutoff),
            post("/new", cutoff + ChronoDuration::minutes(1)),
        ],
        delay: Duration::ZERO,
    })];

    let merged = collect(&sources, cutoff).await;
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].link, "/new");
}

#[tokio::test]
async fn two_sources_one_broken_yield_a_document_with_two_articles() {
    let t = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
    let cutoff = t - ChronoDuration::hours(24);

    let sources: Vec<Arc<dyn FeedSource>> = vec![
        Arc::new(OkSource {
            posts: vec![post("/one", t), post("/two", t + ChronoDuration::hours(1))],
            delay: Duration::ZERO,
        }),
        Arc::new(FailingSource),
    ];

    let merged = collect(&sources, cutoff).await;
    let meta = DocMeta {
        title: "Daily News".into(),
        author: "Kindle Digest".into(),
    };
    let doc = assemble(&meta, merged, &["<p>briefing</p>".to_string()]);

    assert_eq!(doc.matches("<article ").count(), 2);
    assert!(doc.contains("<p>briefing</p>"));
    assert!(doc.contains("id=\"post-1\""));
    assert!(doc.contains("id=\"post-2\""));
}
