// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One entry pulled from a feed. Never mutated after the fetcher builds it;
/// lives only for the cycle that produced it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Post {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Feed/channel title, e.g. "BBC News".
    pub source_name: Option<String>,
    pub published: DateTime<Utc>,
    pub link: String,
    /// Raw untrusted HTML fragment. Sanitized at render time, not here.
    pub body: Option<String>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse this source, keeping only posts strictly newer than `cutoff`.
    async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>>;
    fn name(&self) -> &str;
}
