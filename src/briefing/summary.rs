//! Conversational daily-brief fragment, written by the OpenAI API.
//!
//! The contract with the model is fixed: exactly two `<p>` paragraphs, the
//! first weaving weather and agenda together, the second the top three UK
//! headlines. Without an API key, or on any API failure, a static fallback
//! fragment is assembled from whatever data is on hand.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::briefing::calendar::AgendaEvent;
use crate::briefing::weather::DailyWeather;

const SYSTEM_PROMPT: &str = "You are a concise British daily-brief writer. \
Return exactly TWO HTML <p> paragraphs, no other tags. \
Paragraph 1: a warm, direct opener that weaves in the local weather (description, max/min °C, rain mm, wind km/h) \
and a compact view of the day's agenda (time ranges and titles; at most ~6 items, separated by semicolons). \
Paragraph 2: the top three UK national headlines as short clauses, each with '· Source' (BBC News, The Times, or The Guardian). \
If uncertain about exact titles, write 'Uncertain · BBC/Guardian/The Times' rather than guessing. \
No emojis. British spelling. ~120-180 words total.";

#[derive(Debug, Clone)]
pub struct SummaryContext<'a> {
    /// e.g. "Monday 2 March 2026".
    pub date_label: String,
    /// e.g. "Cardiff, UK".
    pub location: String,
    pub weather: Option<&'a DailyWeather>,
    pub agenda: &'a [AgendaEvent],
}

pub struct SummaryClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl SummaryClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
        }
    }

    /// Produce the briefing fragment. Never fails; degrades to the static
    /// fallback on any problem.
    pub async fn briefing_html(&self, ctx: &SummaryContext<'_>) -> String {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return fallback_fragment(ctx);
        };
        match self.request_summary(api_key, ctx).await {
            Some(frag) => guard_fragment(&frag),
            None => fallback_fragment(ctx),
        }
    }

    async fn request_summary(&self, api_key: &str, ctx: &SummaryContext<'_>) -> Option<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            top_p: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let payload = json!({
            "date_local": ctx.date_label,
            "location": ctx.location,
            "weather": ctx.weather,
            "agenda": &ctx.agenda[..ctx.agenda.len().min(6)],
        });
        let user_msg = format!("DATA (JSON): {payload}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user_msg,
                },
            ],
            temperature: 0.5,
            top_p: 0.9,
            max_tokens: 600,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "summary request rejected");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body.choices.first()?.message.content.trim().to_string();
        if content.is_empty() {
            None
        } else {
            tracing::info!(chars = content.len(), "summary fragment received");
            Some(content)
        }
    }
}

/// Enforce the prompt contract on whatever the model returned: unwrap a
/// full document to its body, then keep only the `<p>` paragraphs. Stray
/// markup or bare text outside them is dropped.
fn guard_fragment(frag: &str) -> String {
    static BODY_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is).*<body[^>]*>(.*)</body>.*").unwrap());
    static P_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>.*?</p\s*>").unwrap());

    let lower = frag.to_lowercase();
    let inner = if lower.contains("<html") || lower.contains("<body") {
        BODY_RE.replace(frag, "$1").trim().to_string()
    } else {
        frag.trim().to_string()
    };
    let paragraphs: String = P_BLOCK_RE.find_iter(&inner).map(|m| m.as_str()).collect();
    if paragraphs.is_empty() {
        // No closed paragraph at all; treat the whole thing as text.
        format!("<p>{}</p>", html_escape::encode_text(&inner))
    } else {
        paragraphs
    }
}

/// Minimal, model-free briefing built from the structured data alone.
fn fallback_fragment(ctx: &SummaryContext<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(w) = ctx.weather {
        let wind = w
            .wind_kmh
            .map(|v| format!("{v} km/h"))
            .unwrap_or_else(|| "—".to_string());
        parts.push(format!(
            "{}: {}. Max {}°C, min {}°C. Rain {} mm. Wind {}.",
            html_escape::encode_text(&ctx.location),
            w.description,
            w.tmax_c,
            w.tmin_c,
            w.rain_mm,
            wind
        ));
    }
    if !ctx.agenda.is_empty() {
        let bits: Vec<String> = ctx
            .agenda
            .iter()
            .take(5)
            .map(|e| {
                let when = if e.all_day {
                    e.start.clone()
                } else {
                    match &e.end {
                        Some(end) => format!("{}–{}", e.start, end),
                        None => e.start.clone(),
                    }
                };
                let loc = e
                    .location
                    .as_deref()
                    .map(|l| format!(" · {l}"))
                    .unwrap_or_default();
                html_escape::encode_text(&format!("{when} — {}{loc}", e.title)).into_owned()
            })
            .collect();
        parts.push(format!("Today: {}.", bits.join("; ")));
    }
    format!(
        "<p>{}</p><p>Top stories: Uncertain · BBC/Guardian/The Times; \
         Uncertain · BBC/Guardian/The Times; Uncertain · BBC/Guardian/The Times.</p>",
        parts.join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(weather: Option<&'a DailyWeather>, agenda: &'a [AgendaEvent]) -> SummaryContext<'a> {
        SummaryContext {
            date_label: "Monday 2 March 2026".into(),
            location: "Cardiff, UK".into(),
            weather,
            agenda,
        }
    }

    #[test]
    fn fallback_without_any_data_still_renders_two_paragraphs() {
        let frag = fallback_fragment(&ctx(None, &[]));
        assert!(frag.starts_with("<p>"));
        assert_eq!(frag.matches("<p>").count(), 2);
        assert!(frag.contains("Uncertain · BBC/Guardian/The Times"));
    }

    #[test]
    fn fallback_includes_weather_and_agenda() {
        let w = DailyWeather {
            description: "Overcast".into(),
            code: 3,
            tmax_c: 12,
            tmin_c: 4,
            rain_mm: 0.2,
            wind_kmh: Some(22),
        };
        let agenda = vec![AgendaEvent {
            start: "14:00".into(),
            end: Some("15:00".into()),
            title: "Team sync".into(),
            location: Some("Room 4".into()),
            all_day: false,
        }];
        let frag = fallback_fragment(&ctx(Some(&w), &agenda));
        assert!(frag.contains("Overcast"));
        assert!(frag.contains("Max 12°C"));
        assert!(frag.contains("14:00–15:00 — Team sync · Room 4"));
    }

    #[test]
    fn guard_unwraps_full_documents() {
        let wrapped = "<html><body>\n<p>one</p><p>two</p>\n</body></html>";
        assert_eq!(guard_fragment(wrapped), "<p>one</p><p>two</p>");
    }

    #[test]
    fn guard_wraps_bare_text_in_a_paragraph() {
        assert_eq!(guard_fragment("just words"), "<p>just words</p>");
    }

    #[test]
    fn guard_drops_markup_and_text_outside_paragraphs() {
        assert_eq!(
            guard_fragment("<p>ok</p><div>x</div>"),
            "<p>ok</p>"
        );
        assert_eq!(
            guard_fragment("preamble <p>one</p> stray <p>two</p> trailer"),
            "<p>one</p><p>two</p>"
        );
    }

    #[test]
    fn missing_api_key_never_calls_out() {
        // No tokio runtime network access needed: key absent short-circuits.
        let client = SummaryClient::new(reqwest::Client::new(), None, "gpt-4o-mini".into());
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let frag = rt.block_on(client.briefing_html(&ctx(None, &[])));
        assert!(frag.contains("Uncertain"));
    }
}
