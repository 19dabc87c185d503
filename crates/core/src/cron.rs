//! Cron expression validation, normalization, and fire-time computation.
//!
//! Job definitions carry schedules in the classic five-field form
//! (minute, hour, day-of-month, month, day-of-week) plus a small set of
//! named aliases. The `cron` parser wants a seconds-first six-field
//! expression and numbers its days of week 1-7 starting at Sunday, so
//! expressions are normalized before parsing: a `0` seconds field is
//! prepended and numeric day-of-week values are shifted from the 0-6
//! (Sunday = 0) convention.

use std::str::FromStr;

use cron::Schedule;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Named shortcuts accepted in place of a five-field expression, with or
/// without the leading `@`.
const ALIASES: &[(&str, &str)] = &[
    ("hourly", "0 * * * *"),
    ("daily", "0 0 * * *"),
    ("midnight", "0 0 * * *"),
    ("weekly", "0 0 * * 0"),
    ("monthly", "0 0 1 * *"),
    ("annually", "0 0 1 1 *"),
    ("yearly", "0 0 1 1 *"),
];

/// Validate a job definition's schedule expression.
///
/// An empty (or blank) expression means "unscheduled" and is always valid;
/// anything else must parse as a five-field expression or a recognized
/// alias. The save-time check for the external definition-editing surface;
/// the scheduler itself goes through [`parse`].
pub fn validate(expr: &str) -> Result<(), CoreError> {
    if expr.trim().is_empty() {
        return Ok(());
    }
    parse(expr).map(|_| ())
}

/// Parse a non-empty five-field expression or alias into a [`Schedule`].
pub fn parse(expr: &str) -> Result<Schedule, CoreError> {
    let normalized = normalize(expr)?;
    Schedule::from_str(&normalized)
        .map_err(|e| CoreError::Validation(format!("invalid cron expression {expr:?}: {e}")))
}

/// The next fire time strictly after `after`, if the schedule has one.
pub fn next_after(schedule: &Schedule, after: Timestamp) -> Option<Timestamp> {
    schedule.after(&after).next()
}

/// Expand aliases, check the field count, and rewrite the expression into
/// the parser's six-field seconds-first grammar.
fn normalize(expr: &str) -> Result<String, CoreError> {
    let trimmed = expr.trim();
    let lookup = trimmed
        .strip_prefix('@')
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    let five_field = ALIASES
        .iter()
        .find(|(name, _)| *name == lookup)
        .map(|(_, expansion)| (*expansion).to_string())
        .unwrap_or_else(|| trimmed.to_string());

    let fields: Vec<&str> = five_field.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(CoreError::Validation(format!(
            "invalid cron expression {expr:?}: expected 5 fields, got {}",
            fields.len()
        )));
    }

    let mut normalized = Vec::with_capacity(6);
    normalized.push("0".to_string());
    for (i, field) in fields.iter().enumerate() {
        if i == 4 {
            normalized.push(shift_day_of_week(field));
        } else {
            normalized.push((*field).to_string());
        }
    }
    Ok(normalized.join(" "))
}

/// Rewrite numeric day-of-week values from the 0-6 convention (Sunday = 0,
/// with 7 also accepted as Sunday) to the parser's 1-7 (Sunday = 1). Names
/// and `*` pass through untouched.
fn shift_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(shift_step_expr)
        .collect::<Vec<_>>()
        .join(",")
}

fn shift_step_expr(part: &str) -> String {
    match part.split_once('/') {
        Some((range, step)) => format!("{}/{}", shift_range(range), step),
        None => shift_range(part),
    }
}

fn shift_range(range: &str) -> String {
    range
        .split('-')
        .map(shift_ordinal)
        .collect::<Vec<_>>()
        .join("-")
}

fn shift_ordinal(value: &str) -> String {
    match value.parse::<u8>() {
        Ok(n) if n <= 7 => ((n % 7) + 1).to_string(),
        _ => value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Timelike, Utc, Weekday};

    use super::*;

    #[test]
    fn empty_expression_is_unscheduled_and_valid() {
        assert!(validate("").is_ok());
        assert!(validate("   ").is_ok());
    }

    #[test]
    fn five_field_expressions_are_accepted() {
        assert!(validate("* * * * *").is_ok());
        assert!(validate("*/5 * * * *").is_ok());
        assert!(validate("0 3 * * 1-5").is_ok());
        assert!(validate("30 6 1,15 * *").is_ok());
    }

    #[test]
    fn aliases_are_accepted_with_and_without_at_sign() {
        for alias in ["@hourly", "hourly", "@daily", "Daily", "@weekly", "@monthly", "@yearly", "@annually", "@midnight"] {
            assert!(validate(alias).is_ok(), "alias {alias:?} should validate");
        }
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expr in ["not a cron", "* * * *", "* * * * * *", "61 * * * *", "* 25 * * *", "@fortnightly"] {
            assert!(validate(expr).is_err(), "expression {expr:?} should fail");
        }
    }

    #[test]
    fn numeric_day_of_week_follows_sunday_zero_convention() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let sunday = parse("0 0 * * 0").unwrap();
        assert_eq!(next_after(&sunday, after).unwrap().weekday(), Weekday::Sun);

        let monday = parse("0 0 * * 1").unwrap();
        assert_eq!(next_after(&monday, after).unwrap().weekday(), Weekday::Mon);

        let friday = parse("0 0 * * 5").unwrap();
        assert_eq!(next_after(&friday, after).unwrap().weekday(), Weekday::Fri);

        let seven_is_sunday = parse("0 0 * * 7").unwrap();
        assert_eq!(
            next_after(&seven_is_sunday, after).unwrap().weekday(),
            Weekday::Sun
        );
    }

    #[test]
    fn day_of_week_ranges_and_lists_shift_too() {
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let weekdays = parse("0 12 * * 1-5").unwrap();
        let mut fires = weekdays.after(&after).take(14);
        assert!(fires.all(|t| {
            let day = t.weekday();
            day != Weekday::Sat && day != Weekday::Sun
        }));

        let tue_thu = parse("0 8 * * 2,4").unwrap();
        let mut fires = tue_thu.after(&after).take(10);
        assert!(fires.all(|t| matches!(t.weekday(), Weekday::Tue | Weekday::Thu)));
    }

    #[test]
    fn hourly_alias_fires_on_the_hour() {
        let after = Utc.with_ymd_and_hms(2026, 3, 10, 14, 20, 0).unwrap();
        let schedule = parse("@hourly").unwrap();
        let next = next_after(&schedule, after).unwrap();
        assert_eq!(next.minute(), 0);
        assert_eq!(next.hour(), 15);
    }

    #[test]
    fn next_after_is_strictly_increasing() {
        let schedule = parse("*/10 * * * *").unwrap();
        let first = next_after(&schedule, Utc::now()).unwrap();
        let second = next_after(&schedule, first).unwrap();
        assert!(second > first);
    }
}
