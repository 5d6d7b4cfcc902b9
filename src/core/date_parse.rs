use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::core::DateInterval;
use crate::error::{ModelError, ModelResult};

const ONGOING_MARKER: &str = "ongoing";

/// Parses a user-entered date into an interval.
///
/// Accepted forms:
/// - `2010`, `2010-03`, `2010-03-04`: the whole year, month or day (UTC)
/// - RFC 3339 instants and `2010-03-04 12:30:00`: that second
/// - `A / B`: the extent covering both `A` and `B`
/// - `A / ongoing` or `A /`: from `A` to "now"
pub fn parse_user_date(input: &str) -> ModelResult<DateInterval> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid_date(input, "empty date"));
    }

    let mut parts = trimmed.split('/');
    let lower = parts.next().unwrap_or_default();
    let upper = parts.next();
    if parts.next().is_some() {
        return Err(invalid_date(input, "more than one `/` separator"));
    }

    let (lower_min, lower_max) = parse_period(lower.trim(), input)?;
    let Some(upper) = upper.map(str::trim) else {
        return DateInterval::new(lower_min, lower_max);
    };

    if upper.is_empty() || upper.eq_ignore_ascii_case(ONGOING_MARKER) {
        return Ok(DateInterval::ongoing(lower_min, lower_max));
    }

    let (upper_min, upper_max) = parse_period(upper, input)?;
    DateInterval::new(lower_min.min(upper_min), lower_max.max(upper_max))
}

fn parse_period(text: &str, input: &str) -> ModelResult<(i64, i64)> {
    if text.is_empty() {
        return Err(invalid_date(input, "missing start date"));
    }

    let segments: Vec<&str> = text.split('-').collect();
    let all_digits = segments
        .iter()
        .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()));

    if all_digits {
        return match segments.as_slice() {
            [year] if year.len() == 4 => {
                let year = parse_number(year, input)?;
                let first = calendar_date(year, 1, 1, input)?;
                let next = calendar_date(year + 1, 1, 1, input)?;
                Ok(period_bounds(first, next))
            }
            [year, month] if year.len() == 4 && month.len() == 2 => {
                let year = parse_number(year, input)?;
                let month = parse_number(month, input)?;
                let first = calendar_date(year, month as u32, 1, input)?;
                let next = if first.month() == 12 {
                    calendar_date(year + 1, 1, 1, input)?
                } else {
                    calendar_date(year, first.month() + 1, 1, input)?
                };
                Ok(period_bounds(first, next))
            }
            [year, month, day] if year.len() == 4 && month.len() == 2 && day.len() == 2 => {
                let first = calendar_date(
                    parse_number(year, input)?,
                    parse_number(month, input)? as u32,
                    parse_number(day, input)? as u32,
                    input,
                )?;
                let next = first
                    .succ_opt()
                    .ok_or_else(|| invalid_date(input, "day out of range"))?;
                Ok(period_bounds(first, next))
            }
            _ => Err(invalid_date(input, "unrecognized calendar date")),
        };
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        let at = instant.timestamp_millis();
        return Ok((at, at));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            let start = naive.and_utc().timestamp_millis();
            return Ok((start, start + 999));
        }
    }

    Err(invalid_date(input, "unrecognized date format"))
}

fn parse_number(text: &str, input: &str) -> ModelResult<i32> {
    text.parse::<i32>()
        .map_err(|_| invalid_date(input, "number out of range"))
}

fn calendar_date(year: i32, month: u32, day: u32, input: &str) -> ModelResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid_date(input, "calendar date out of range"))
}

fn period_bounds(first: NaiveDate, next: NaiveDate) -> (i64, i64) {
    let start = day_start_millis(first);
    let end = day_start_millis(next) - 1;
    (start, end)
}

fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(0, |start| start.and_utc().timestamp_millis())
}

fn invalid_date(input: &str, reason: &str) -> ModelError {
    ModelError::InvalidDate {
        input: input.to_owned(),
        reason: reason.to_owned(),
    }
}
