//! Sanitizer for untrusted feed fragments.
//!
//! Scope: per-item HTML fragments only. The assembled document carries a
//! trusted style block that this denylist would destroy, so it is never run
//! through here.

use once_cell::sync::Lazy;
use regex::Regex;

const BAD_ELEMENTS: [&str; 9] = [
    "script", "style", "iframe", "svg", "object", "embed", "noscript", "video", "audio",
];

/// Well-formed denylisted elements, content included. The `regex` crate has
/// no backreferences, so the pairs are spelled out per element name.
static BAD_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    let alts: Vec<String> = BAD_ELEMENTS
        .iter()
        .map(|t| format!(r"<{t}\b[^>]*>.*?</{t}\s*>"))
        .collect();
    Regex::new(&format!("(?is){}", alts.join("|"))).unwrap()
});

/// Stray opening/closing denylisted tags left over from malformed markup.
static BAD_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)</?(?:{})\b[^>]*>", BAD_ELEMENTS.join("|"))).unwrap()
});

static IMG_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*/?>").unwrap());

/// Clean a feed content fragment so it is safe to embed inside the digest
/// body. Pure and idempotent. Do not use on the full document.
pub fn sanitize_fragment(fragment: &str) -> String {
    // Thin spaces render as tofu on older Kindle firmware.
    let mut out = fragment.replace("&thinsp;", " ").replace('\u{2009}', " ");

    // Every removal can splice the surrounding text into a brand-new
    // denylisted tag (`<scr<img>ipt>` becomes `<script>` once the image
    // goes), so all three passes iterate to one shared fixpoint: the result
    // is only accepted when a full round changes nothing.
    loop {
        let mut next = out.clone();
        loop {
            let paired = BAD_PAIR_RE.replace_all(&next, "").into_owned();
            if paired == next {
                break;
            }
            next = paired;
        }
        next = BAD_TAG_RE.replace_all(&next, "").into_owned();
        next = IMG_TAG_RE.replace_all(&next, "").into_owned();
        if next == out {
            break;
        }
        out = next;
    }
    out
}
