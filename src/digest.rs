//! Document assembler: deterministic ordering + HTML rendering.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::ingest::types::Post;
use crate::sanitize::sanitize_fragment;

#[derive(Debug, Clone)]
pub struct DocMeta {
    pub title: String,
    pub author: String,
}

const HTML_HEAD_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <title>{DOC_TITLE}</title>
  <style>
    body { font-family: serif; line-height: 1.4; }
    h1,h2,h3 { margin-top: 1.2em; }
    .k-card { padding: 0.6em 0.8em; border: 1px solid #ddd; border-radius: 4px; }
    .muted { color: #555; }
    ol.headlines { padding-left: 1.2em; }
    ol.headlines li { margin: 0.4em 0; }
    article { margin: 1em 0; }
  </style>
</head>
<body>
"#;

const HTML_TAIL: &str = "\n</body>\n</html>\n";

/// "9 March 2026": unpadded day, English month, deterministic for a given instant.
pub fn nice_date(t: DateTime<Utc>) -> String {
    t.format("%-d %B %Y").to_string()
}

/// "9:41 pm": 12-hour clock, no leading zero, lowercase meridiem.
pub fn nice_time(t: DateTime<Utc>) -> String {
    t.format("%-I:%M %P").to_string()
}

fn render_post(post: &Post, idx: usize) -> String {
    let title = encode_text(post.title.as_deref().unwrap_or("Untitled"));
    let author = encode_text(post.author.as_deref().unwrap_or("Unknown"));
    let source = encode_text(post.source_name.as_deref().unwrap_or("Source"));
    let link = encode_double_quoted_attribute(&post.link);
    let body = sanitize_fragment(post.body.as_deref().unwrap_or(""));
    format!(
        "\n<article id=\"post-{idx}\">\n  <h2><a href=\"{link}\">{title}</a></h2>\n  \
         <p class=\"muted\"><small>By {author} for <i>{source}</i>, on {date} at {time}.</small></p>\n  {body}\n</article>\n",
        date = nice_date(post.published),
        time = nice_time(post.published),
    )
}

/// Assemble the digest document.
///
/// Posts are sorted ascending by publication instant (stable, so arrival
/// order breaks ties), each rendered as an `<article>` with a `post-{n}`
/// anchor so an auxiliary index can cross-reference it. Auxiliary sections
/// are emitted first, in the order given. With no posts the document
/// degrades to the auxiliary sections alone.
pub fn assemble(meta: &DocMeta, mut posts: Vec<Post>, aux_sections: &[String]) -> String {
    posts.sort_by_key(|p| p.published);

    let mut doc = HTML_HEAD_TEMPLATE.replace("{DOC_TITLE}", &encode_text(&meta.title));
    for section in aux_sections {
        doc.push_str(section);
        doc.push('\n');
    }
    if !posts.is_empty() {
        doc.push_str("\n<h1>Articles</h1>\n");
        for (idx, post) in posts.iter().enumerate() {
            doc.push_str(&render_post(post, idx + 1));
        }
    }
    doc.push_str(HTML_TAIL);
    doc
}
