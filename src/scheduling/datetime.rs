//! Free-text meeting-time resolution.
//!
//! Replies mention availability in loose English ("tomorrow 3pm",
//! "next Tuesday, November 18 at 10 AM"). The resolver turns such text
//! into a concrete UTC timestamp against a caller-supplied anchor,
//! with three rules tried in order:
//!
//! 1. "tomorrow" — same clock time tomorrow, adjusted by the first
//!    `h(:mm) am/pm` mention anywhere in the text
//! 2. "next week" — the anchor plus seven days
//! 3. a fuzzy date/time scan: month-name dates, day-first dates,
//!    numeric m/d(/y), weekday names (next occurrence, today counts),
//!    each optionally combined with a clock time; a time alone anchors
//!    to today
//!
//! Components the text does not specify inherit from the anchor. A
//! resolved moment already in the past is pushed to the following year
//! rather than scheduled backwards; this is a heuristic, not a
//! guarantee the lead meant that.
//!
//! `None` means "no usable moment found" and sends the pipeline down
//! the follow-up path, so the resolver prefers giving up over guessing
//! wildly.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use regex::Regex;

/// Resolves free-text availability into concrete timestamps.
///
/// All patterns are compiled once at construction; keep one resolver
/// per pipeline run.
pub struct DateTimeResolver {
    clock: Regex,
    month_day: Regex,
    day_month: Regex,
    numeric: Regex,
    weekday: Regex,
    time: Regex,
}

impl DateTimeResolver {
    pub fn new() -> Self {
        Self {
            clock: Regex::new(r"(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm)?").unwrap(),
            month_day: Regex::new(
                r"\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s*(\d{4}))?",
            )
            .unwrap(),
            day_month: Regex::new(
                r"\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b(?:,?\s*(\d{4}))?",
            )
            .unwrap(),
            numeric: Regex::new(r"\b(\d{1,2})[/-](\d{1,2})(?:[/-](\d{2,4}))?\b").unwrap(),
            weekday: Regex::new(
                r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues|tue|weds|wed|thurs|thur|thu|fri|sat|sun)\b",
            )
            .unwrap(),
            time: Regex::new(r"(?:\b(at)\s+)?\b(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm)?\b").unwrap(),
        }
    }

    /// Resolve `text` into a timestamp, or `None` when nothing usable
    /// is mentioned.
    pub fn resolve(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let txt = text.trim().to_lowercase();
        if txt.is_empty() {
            return None;
        }

        if txt.contains("tomorrow") {
            return Some(self.tomorrow(&txt, now));
        }
        if txt.contains("next week") {
            return Some(now + Duration::days(7));
        }
        self.fuzzy(&txt, now)
    }

    /// "tomorrow", clock-adjusted by the first time-like mention.
    fn tomorrow(&self, txt: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let fallback = now + Duration::days(1);
        if let Some(caps) = self.clock.captures(txt) {
            let hour: u32 = caps[1].parse().unwrap_or(0);
            let minute: u32 = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let hour = match caps.get(3) {
                Some(half) if half.as_str() == "pm" && hour < 12 => hour + 12,
                _ => hour,
            };
            // Impossible clock values ("tomorrow at 26") degrade to
            // plain tomorrow instead of failing the whole resolve.
            if let Some(at) = fallback
                .with_hour(hour)
                .and_then(|d| d.with_minute(minute))
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))
            {
                return at;
            }
        }
        fallback
    }

    fn fuzzy(&self, txt: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let date = self.find_date(txt, now);
        let time = self.find_time(txt);

        if date.is_none() && time.is_none() {
            return None;
        }

        let resolved = date
            .unwrap_or_else(|| now.date_naive())
            .and_time(time.unwrap_or_else(|| now.time()))
            .and_utc();

        if resolved < now {
            // A mention like "January 5" seen in November means next
            // year. Feb 29 can fall off the calendar here; that reads
            // as "no usable moment" and takes the follow-up path.
            resolved.with_year(now.year() + 1)
        } else {
            Some(resolved)
        }
    }

    fn find_date(&self, txt: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
        if let Some(caps) = self.month_day.captures(txt) {
            let month = month_number(&caps[1])?;
            let day: u32 = caps[2].parse().ok()?;
            let year = parse_year(caps.get(3), now);
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        if let Some(caps) = self.day_month.captures(txt) {
            let day: u32 = caps[1].parse().ok()?;
            let month = month_number(&caps[2])?;
            let year = parse_year(caps.get(3), now);
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        if let Some(caps) = self.numeric.captures(txt) {
            let mut month: u32 = caps[1].parse().ok()?;
            let mut day: u32 = caps[2].parse().ok()?;
            // Month-first by convention; an impossible month flips the
            // order ("18/11" means November 18).
            if month > 12 && day <= 12 {
                std::mem::swap(&mut month, &mut day);
            }
            let year = parse_year(caps.get(3), now);
            return NaiveDate::from_ymd_opt(year, month, day);
        }

        if let Some(m) = self.weekday.find(txt) {
            let target = weekday_number(m.as_str())?;
            let today = now.weekday().num_days_from_monday();
            let ahead = (7 + target - today) % 7;
            return Some(now.date_naive() + Duration::days(i64::from(ahead)));
        }

        None
    }

    fn find_time(&self, txt: &str) -> Option<NaiveTime> {
        for caps in self.time.captures_iter(txt) {
            let qualified = caps.get(1).is_some() // "at " prefix
                || caps.get(3).is_some() // minutes
                || caps.get(4).is_some(); // am/pm
            if !qualified {
                // A bare number is a day-of-month, not a time.
                continue;
            }
            let Ok(hour) = caps[2].parse::<u32>() else {
                continue;
            };
            let minute: u32 = caps
                .get(3)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let hour = match caps.get(4).map(|m| m.as_str()) {
                Some("pm") if hour < 12 => hour + 12,
                Some("am") if hour == 12 => 0,
                _ => hour,
            };
            if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
                return Some(time);
            }
        }
        None
    }
}

impl Default for DateTimeResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn month_number(token: &str) -> Option<u32> {
    let n = match token {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn weekday_number(token: &str) -> Option<u32> {
    let n = match token.get(..3)? {
        "mon" => 0,
        "tue" => 1,
        "wed" => 2,
        "thu" => 3,
        "fri" => 4,
        "sat" => 5,
        "sun" => 6,
        _ => return None,
    };
    Some(n)
}

fn parse_year(capture: Option<regex::Match<'_>>, now: DateTime<Utc>) -> i32 {
    match capture.and_then(|y| y.as_str().parse::<i32>().ok()) {
        Some(y) if y < 100 => y + 2000,
        Some(y) => y,
        None => now.year(),
    }
}
