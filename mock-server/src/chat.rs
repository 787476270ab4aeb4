//! Rule-based extraction of event details from a free-text request.
//!
//! Recognises ISO dates, `today`/`tomorrow`, 24-hour `HH:MM`, `3pm`,
//! `3:30pm` and `noon`. The first time found is the start, the second the
//! end. Missing pieces fall back to today, 09:00, and start plus one hour.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveTime};
use regex::Regex;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid date regex"));

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(\d{1,2})(?::(\d{2}))?\s*(am|pm)|(\d{1,2}):(\d{2})|(noon|midnight))\b")
        .expect("valid time regex")
});

static TITLE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s+)(?:at|on|from|today|tomorrow|next)\b").expect("valid title regex")
});

const DEFAULT_START: &str = "09:00";
const UNTITLED: &str = "Untitled Event";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

pub fn extract(query: &str, today: NaiveDate) -> Extracted {
    let mut times = TIME.captures_iter(query).filter_map(|c| {
        if let Some(word) = c.get(6) {
            let hour = if word.as_str().eq_ignore_ascii_case("noon") { 12 } else { 0 };
            return NaiveTime::from_hms_opt(hour, 0, 0);
        }
        if let (Some(h), Some(m)) = (c.get(4), c.get(5)) {
            return NaiveTime::from_hms_opt(h.as_str().parse().ok()?, m.as_str().parse().ok()?, 0);
        }
        let hour: u32 = c.get(1)?.as_str().parse().ok()?;
        let minute: u32 = c.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = c.get(3)?.as_str().eq_ignore_ascii_case("pm");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        NaiveTime::from_hms_opt(hour, minute, 0)
    });

    let start = times.next();
    let end = times.next();

    let start_time = start.map_or_else(|| DEFAULT_START.to_string(), |t| t.format("%H:%M").to_string());
    let end_time = match end {
        Some(t) => t.format("%H:%M").to_string(),
        None => one_hour_after(start.unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())),
    };

    Extracted {
        title: title_of(query),
        date: date_of(query, today),
        start_time,
        end_time,
    }
}

fn date_of(query: &str, today: NaiveDate) -> NaiveDate {
    if let Some(date) = ISO_DATE
        .captures(query)
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
    {
        return date;
    }
    if query.to_lowercase().contains("tomorrow") {
        return today + Duration::days(1);
    }
    today
}

/// An event running past midnight is clipped to the end of the day.
fn one_hour_after(start: NaiveTime) -> String {
    let (end, wrapped) = start.overflowing_add_signed(Duration::hours(1));
    if wrapped != 0 {
        return "23:59".to_string();
    }
    end.format("%H:%M").to_string()
}

fn title_of(query: &str) -> String {
    let query = query.trim();
    let head = match TITLE_END.find(query) {
        Some(m) => &query[..m.start()],
        None => query,
    };
    let head = head.trim();
    if head.is_empty() {
        return UNTITLED.to_string();
    }
    let mut chars = head.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => UNTITLED.to_string(),
    }
}
