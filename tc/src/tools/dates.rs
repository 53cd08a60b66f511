//! Best-effort due date parsing
//!
//! Accepts ISO timestamps, a handful of common date layouts, and simple
//! relative phrases ("tomorrow", "in 3 days", "next friday at 5pm").
//! Anything else yields `None`; an unparseable date is never an error.
//! Inputs without an explicit zone are taken as UTC, and date-only inputs
//! resolve to midnight.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
];

/// Parse a due date relative to `now`
pub fn parse_due_date(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_absolute(text).or_else(|| parse_relative(&text.to_lowercase(), now))
}

fn parse_absolute(text: &str) -> Option<DateTime<Utc>> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

fn parse_relative(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut words: Vec<&str> = text.split_whitespace().collect();

    let mut time = None;
    if let Some(t) = words.last().and_then(|w| parse_time(w)) {
        time = Some(t);
        words.pop();
        if words.last() == Some(&"at") {
            words.pop();
        }
    }

    let today = now.date_naive();
    let date = match words.as_slice() {
        [] if time.is_some() => today,
        ["today"] | ["tonight"] => today,
        ["tomorrow"] => today.checked_add_days(Days::new(1))?,
        ["yesterday"] => today.checked_sub_days(Days::new(1))?,
        ["next", "week"] => today.checked_add_days(Days::new(7))?,
        ["next", "month"] => today.checked_add_days(Days::new(30))?,
        ["in", count, unit] => {
            let count: u64 = count.parse().ok()?;
            today.checked_add_days(Days::new(count.checked_mul(unit_days(unit)?)?))?
        }
        ["this", day] => upcoming(today, parse_weekday(day)?, true)?,
        ["next", day] | [day] => upcoming(today, parse_weekday(day)?, false)?,
        _ => return None,
    };

    let time = match time {
        Some(t) => t,
        None => NaiveTime::from_hms_opt(0, 0, 0)?,
    };
    Some(date.and_time(time).and_utc())
}

fn unit_days(unit: &str) -> Option<u64> {
    match unit {
        "day" | "days" => Some(1),
        "week" | "weeks" => Some(7),
        "month" | "months" => Some(30),
        _ => None,
    }
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Next date falling on `weekday`; today only counts when `include_today`
fn upcoming(today: NaiveDate, weekday: Weekday, include_today: bool) -> Option<NaiveDate> {
    let ahead = (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 && !include_today { 7 } else { ahead };
    today.checked_add_days(Days::new(u64::from(ahead)))
}

/// "14:00", "9:30", "3pm", "3:30pm"
fn parse_time(token: &str) -> Option<NaiveTime> {
    let (body, pm) = match token.strip_suffix("pm") {
        Some(body) => (body, Some(true)),
        None => match token.strip_suffix("am") {
            Some(body) => (body, Some(false)),
            None => (token, None),
        },
    };

    let (hour, minute) = match body.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None if pm.is_some() => (body.parse::<u32>().ok()?, 0),
        None => return None,
    };

    let hour = match pm {
        Some(pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            hour % 12 + if pm { 12 } else { 0 }
        }
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Wednesday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 7, 10, 30, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_iso_formats() {
        assert_eq!(parse_due_date("2026-01-15T14:00:00Z", now()), Some(at(2026, 1, 15, 14, 0)));
        assert_eq!(parse_due_date("2026-01-15 14:00", now()), Some(at(2026, 1, 15, 14, 0)));
        assert_eq!(parse_due_date("2026-01-15", now()), Some(at(2026, 1, 15, 0, 0)));
    }

    #[test]
    fn test_other_date_layouts() {
        assert_eq!(parse_due_date("01/20/2026", now()), Some(at(2026, 1, 20, 0, 0)));
        assert_eq!(parse_due_date("January 20, 2026", now()), Some(at(2026, 1, 20, 0, 0)));
    }

    #[test]
    fn test_relative_days() {
        assert_eq!(parse_due_date("today", now()), Some(at(2026, 1, 7, 0, 0)));
        assert_eq!(parse_due_date("Tomorrow", now()), Some(at(2026, 1, 8, 0, 0)));
        assert_eq!(parse_due_date("in 3 days", now()), Some(at(2026, 1, 10, 0, 0)));
        assert_eq!(parse_due_date("in 2 weeks", now()), Some(at(2026, 1, 21, 0, 0)));
        assert_eq!(parse_due_date("next week", now()), Some(at(2026, 1, 14, 0, 0)));
    }

    #[test]
    fn test_weekdays() {
        assert_eq!(parse_due_date("friday", now()), Some(at(2026, 1, 9, 0, 0)));
        assert_eq!(parse_due_date("next Wednesday", now()), Some(at(2026, 1, 14, 0, 0)));
        assert_eq!(parse_due_date("this wednesday", now()), Some(at(2026, 1, 7, 0, 0)));
    }

    #[test]
    fn test_times() {
        assert_eq!(parse_due_date("tomorrow at 3pm", now()), Some(at(2026, 1, 8, 15, 0)));
        assert_eq!(parse_due_date("friday 9:30", now()), Some(at(2026, 1, 9, 9, 30)));
        assert_eq!(parse_due_date("12am", now()), Some(at(2026, 1, 7, 0, 0)));
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(parse_due_date("someday maybe", now()), None);
        assert_eq!(parse_due_date("", now()), None);
        assert_eq!(parse_due_date("in lots of days", now()), None);
        assert_eq!(parse_due_date("in 99999999999999999 weeks", now()), None);
        assert_eq!(parse_due_date("13pm", now()), None);
    }
}
