//! HTTP feed source: fetches one RSS 2.0 or Atom feed and turns it into `Post`s.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use crate::ingest::types::{FeedSource, Post};

// ---------------------------------------------------------------------------
// RSS 2.0 shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    author: Option<String>,
    #[serde(rename = "dc:creator")]
    creator: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "content:encoded")]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Atom shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<String>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    author: Option<AtomAuthor>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

/// Feeds ship RFC 2822 (`pubDate`) or RFC 3339 (`published`/`updated`) stamps.
fn parse_feed_instant(ts: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()?;
    let unix = odt.to_offset(UtcOffset::UTC).unix_timestamp();
    DateTime::<Utc>::from_timestamp(unix, 0)
}

/// Bare named entities inside item descriptions break strict XML parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "…")
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a feed document, trying RSS 2.0 first and falling back to Atom.
/// Entries without a parseable publication instant are dropped; the cutoff
/// comparison needs one.
pub fn parse_feed(xml: &str) -> Result<Vec<Post>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let posts = if let Ok(rss) = from_str::<Rss>(&xml_clean) {
        rss_posts(rss)
    } else {
        let feed: AtomFeed = from_str(&xml_clean).context("parsing feed as RSS then Atom")?;
        atom_posts(feed)
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("digest_parse_ms").record(ms);
    counter!("digest_posts_parsed_total").increment(posts.len() as u64);
    Ok(posts)
}

fn rss_posts(rss: Rss) -> Vec<Post> {
    let source_name = rss.channel.title;
    let mut out = Vec::with_capacity(rss.channel.items.len());
    for it in rss.channel.items {
        let Some(published) = it.pub_date.as_deref().and_then(parse_feed_instant) else {
            continue;
        };
        let Some(link) = it.link else { continue };
        out.push(Post {
            title: it.title,
            author: it.author.or(it.creator),
            source_name: source_name.clone(),
            published,
            link,
            body: it.content.or(it.description),
        });
    }
    out
}

fn atom_posts(feed: AtomFeed) -> Vec<Post> {
    let source_name = feed.title;
    let mut out = Vec::with_capacity(feed.entries.len());
    for e in feed.entries {
        let stamp = e.published.as_deref().or(e.updated.as_deref());
        let Some(published) = stamp.and_then(parse_feed_instant) else {
            continue;
        };
        // Prefer rel="alternate"; plenty of feeds leave rel off entirely.
        let link = e
            .links
            .iter()
            .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
            .and_then(|l| l.href.clone());
        let Some(link) = link else { continue };
        out.push(Post {
            title: e.title,
            author: e.author.and_then(|a| a.name),
            source_name: source_name.clone(),
            published,
            link,
            body: e.content.or(e.summary),
        });
    }
    out
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

pub struct HttpFeedSource {
    url: String,
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(url: String, client: reqwest::Client) -> Self {
        Self { url, client }
    }

    /// Client with bounded timeouts so one hung feed cannot stall the cycle.
    pub fn default_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("kindle-digest/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default()
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Post>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?;
        if !resp.status().is_success() {
            return Err(anyhow!("{}: HTTP {}", self.url, resp.status()));
        }
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading body of {}", self.url))?;
        let mut posts = parse_feed(&body)?;
        posts.retain(|p| p.published > cutoff);
        Ok(posts)
    }

    fn name(&self) -> &str {
        &self.url
    }
}
