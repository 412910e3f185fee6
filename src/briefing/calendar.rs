//! Today's agenda from subscribed ICS calendars.
//!
//! The parser covers the slice of RFC 5545 the briefing needs: unfolded
//! lines, VEVENT blocks, DTSTART/DTEND/SUMMARY/LOCATION. No crate in our
//! stack parses ICS, so this stays deliberately minimal.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AgendaEvent {
    /// "All day" or a local "HH:MM".
    pub start: String,
    pub end: Option<String>,
    pub title: String,
    pub location: Option<String>,
    pub all_day: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum IcsStamp {
    /// Date-only value: an all-day event.
    Date(NaiveDate),
    At(DateTime<Utc>),
}

/// RFC 5545 long lines continue on the next line after a space or tab.
fn unfold(ics: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in ics.lines() {
        if let Some(cont) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(cont);
                continue;
            }
        }
        lines.push(raw.trim_end_matches('\r').to_string());
    }
    lines
}

/// Parse an ICS property value: `YYYYMMDD`, `YYYYMMDDTHHMMSS[Z]`.
/// Floating local times are treated as UTC; good enough for an agenda line.
fn parse_stamp(value: &str) -> Option<IcsStamp> {
    let v = value.trim();
    if let Some((date_part, time_part)) = v.split_once('T') {
        let naive_date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
        let time_part = time_part.strip_suffix('Z').unwrap_or(time_part);
        let naive = NaiveDateTime::new(
            naive_date,
            chrono::NaiveTime::parse_from_str(time_part, "%H%M%S").ok()?,
        );
        Some(IcsStamp::At(Utc.from_utc_datetime(&naive)))
    } else {
        NaiveDate::parse_from_str(v, "%Y%m%d").ok().map(IcsStamp::Date)
    }
}

fn local_hhmm(t: DateTime<Utc>, offset: FixedOffset) -> String {
    t.with_timezone(&offset).format("%H:%M").to_string()
}

fn local_date(stamp: IcsStamp, offset: FixedOffset) -> NaiveDate {
    match stamp {
        IcsStamp::Date(d) => d,
        IcsStamp::At(t) => t.with_timezone(&offset).date_naive(),
    }
}

/// Extract today's events from one ICS document.
pub fn parse_today(ics: &str, today: NaiveDate, offset: FixedOffset) -> Vec<AgendaEvent> {
    let mut events = Vec::new();
    let mut in_event = false;
    let mut start: Option<IcsStamp> = None;
    let mut end: Option<IcsStamp> = None;
    let mut summary: Option<String> = None;
    let mut location: Option<String> = None;

    for line in unfold(ics) {
        if line == "BEGIN:VEVENT" {
            in_event = true;
            start = None;
            end = None;
            summary = None;
            location = None;
            continue;
        }
        if line == "END:VEVENT" {
            in_event = false;
            if let Some(ev) = finish_event(start, end, &summary, &location, today, offset) {
                events.push(ev);
            }
            continue;
        }
        if !in_event {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        // Drop parameters: "DTSTART;TZID=Europe/London" -> "DTSTART".
        let prop = name.split(';').next().unwrap_or(name);
        match prop {
            "DTSTART" => start = parse_stamp(value),
            "DTEND" => end = parse_stamp(value),
            "SUMMARY" => summary = Some(value.trim().to_string()),
            "LOCATION" => {
                let loc = value.trim();
                if !loc.is_empty() {
                    location = Some(loc.to_string());
                }
            }
            _ => {}
        }
    }

    // All-day events first, then by start time.
    events.sort_by(|a, b| {
        let ka = (!a.all_day, a.start.clone(), a.end.clone().unwrap_or_default());
        let kb = (!b.all_day, b.start.clone(), b.end.clone().unwrap_or_default());
        ka.cmp(&kb)
    });
    events
}

fn finish_event(
    start: Option<IcsStamp>,
    end: Option<IcsStamp>,
    summary: &Option<String>,
    location: &Option<String>,
    today: NaiveDate,
    offset: FixedOffset,
) -> Option<AgendaEvent> {
    let start = start?;
    if local_date(start, offset) != today {
        return None;
    }
    let title = summary.clone().unwrap_or_else(|| "Untitled".to_string());
    // Placeholder blocks the calendar owner uses to reserve time.
    if title == "Calendar block" {
        return None;
    }

    let (start_label, all_day, end_label) = match start {
        IcsStamp::Date(_) => ("All day".to_string(), true, None),
        IcsStamp::At(s) => {
            let end_label = match end {
                Some(IcsStamp::At(e)) if local_date(IcsStamp::At(e), offset) == today => {
                    Some(local_hhmm(e, offset))
                }
                _ => None,
            };
            (local_hhmm(s, offset), false, end_label)
        }
    };
    Some(AgendaEvent {
        start: start_label,
        end: end_label,
        title,
        location: location.clone(),
        all_day,
    })
}

/// Fetch every configured calendar and merge today's events. A failing URL
/// is skipped; it must never take the briefing down.
pub async fn fetch_today(
    client: &reqwest::Client,
    urls: &[String],
    today: NaiveDate,
    offset: FixedOffset,
) -> Vec<AgendaEvent> {
    let mut all = Vec::new();
    for url in urls {
        let body = match client.get(url).send().await {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => resp.text().await.ok(),
                Err(e) => {
                    tracing::warn!(error = ?e, url, "calendar request rejected");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, url, "calendar request failed");
                None
            }
        };
        if let Some(body) = body {
            all.extend(parse_today(&body, today, offset));
        }
    }
    all.sort_by(|a, b| {
        let ka = (!a.all_day, a.start.clone(), a.end.clone().unwrap_or_default());
        let kb = (!b.all_day, b.start.clone(), b.end.clone().unwrap_or_default());
        ka.cmp(&kb)
    });
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICS: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
DTSTART;TZID=Europe/London:20260302T140000Z\r\n\
DTEND:20260302T150000Z\r\n\
SUMMARY:Team sync\r\n\
LOCATION:Room 4\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART;VALUE=DATE:20260302\r\n\
SUMMARY:Conference day\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20260302T090000Z\r\n\
SUMMARY:Calendar block\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20260303T090000Z\r\n\
SUMMARY:Tomorrow, excluded\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn keeps_todays_events_all_day_first() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let events = parse_today(ICS, today, utc);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Conference day");
        assert!(events[0].all_day);
        assert_eq!(events[0].start, "All day");

        assert_eq!(events[1].title, "Team sync");
        assert_eq!(events[1].start, "14:00");
        assert_eq!(events[1].end.as_deref(), Some("15:00"));
        assert_eq!(events[1].location.as_deref(), Some("Room 4"));
    }

    #[test]
    fn timezone_offset_shifts_the_day_boundary() {
        let ics = "BEGIN:VEVENT\r\nDTSTART:20260302T233000Z\r\nSUMMARY:Late call\r\nEND:VEVENT\r\n";
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        // 23:30 UTC is already March 3rd at +02:00.
        let today = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let events = parse_today(ics, today, plus_two);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, "01:30");
    }

    #[test]
    fn folded_summary_lines_are_joined() {
        let ics = "BEGIN:VEVENT\r\nDTSTART:20260302T100000Z\r\nSUMMARY:A very long\r\n  meeting title\r\nEND:VEVENT\r\n";
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let events = parse_today(ics, today, FixedOffset::east_opt(0).unwrap());
        assert_eq!(events[0].title, "A very long meeting title");
    }

    #[test]
    fn garbage_ics_produces_no_events() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert!(parse_today("not an ics file", today, FixedOffset::east_opt(0).unwrap()).is_empty());
    }
}
