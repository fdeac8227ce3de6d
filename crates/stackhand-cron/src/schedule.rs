//! Cron expression grammar.
//!
//! Accepted forms:
//!
//! - five fields: `minute hour day-of-month month day-of-week`, where
//!   day-of-week is `0-7` (both `0` and `7` are Sunday) or `SUN`..`SAT`
//! - descriptors: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//!   `@midnight`, `@hourly`
//! - `@every <duration>` with `h`, `m`, `s` and `ms` units, e.g. `@every 1h30m`
//!
//! When both day-of-month and day-of-week are restricted, a time matches
//! if either field matches. A stepped wildcard such as `*/2` counts as
//! restricted. All times are UTC.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::ScheduleError;

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A parsed, validated schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    source: String,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    /// Calendar schedules; a time fires if any of them matches.
    Calendar(Vec<Schedule>),
    Every(Duration),
}

impl CronSchedule {
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let source = input.trim();
        if source.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let kind = match source.strip_prefix('@') {
            Some(descriptor) => {
                let (name, arg) = descriptor
                    .split_once(char::is_whitespace)
                    .map(|(n, a)| (n, a.trim()))
                    .unwrap_or((descriptor, ""));
                match name.to_ascii_lowercase().as_str() {
                    "every" => Kind::Every(parse_every(arg)?),
                    "yearly" | "annually" => calendar("0 0 1 1 *")?,
                    "monthly" => calendar("0 0 1 * *")?,
                    "weekly" => calendar("0 0 * * 0")?,
                    "daily" | "midnight" => calendar("0 0 * * *")?,
                    "hourly" => calendar("0 * * * *")?,
                    _ => return Err(ScheduleError::UnknownDescriptor(source.to_string())),
                }
            }
            None => calendar(source)?,
        };

        Ok(Self {
            source: source.to_string(),
            kind,
        })
    }

    /// The expression as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Fixed interval for `@every` schedules.
    pub fn interval(&self) -> Option<Duration> {
        match self.kind {
            Kind::Every(interval) => Some(interval),
            Kind::Calendar(_) => None,
        }
    }

    /// First firing strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match &self.kind {
            Kind::Calendar(schedules) => schedules
                .iter()
                .filter_map(|s| s.after(&after).next())
                .min(),
            Kind::Every(interval) => {
                let step = chrono::Duration::from_std(*interval).ok()?;
                after.checked_add_signed(step)
            }
        }
    }
}

impl FromStr for CronSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Translate five fields into one or two `cron` crate schedules.
fn calendar(expr: &str) -> Result<Kind, ScheduleError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let [minute, hour, dom, month, dow] = fields[..] else {
        return Err(ScheduleError::FieldCount(fields.len()));
    };

    let minute = any_to_star(minute);
    let hour = any_to_star(hour);
    let month = any_to_star(month);
    let dom_star = is_star(dom);
    let dow_star = is_star(dow);
    let dom = any_to_star(dom);
    let dow = translate_dow(dow)?;

    let exprs = if dom_star || dow_star {
        vec![format!("0 {minute} {hour} {dom} {month} {dow}")]
    } else {
        vec![
            format!("0 {minute} {hour} {dom} {month} *"),
            format!("0 {minute} {hour} * {month} {dow}"),
        ]
    };

    let schedules = exprs
        .iter()
        .map(|e| Schedule::from_str(e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Kind::Calendar(schedules))
}

/// A field is unrestricted when one of its items is `*` or `?`, bare or
/// with a step of 1. A larger step (`*/2`) restricts the field.
fn is_star(field: &str) -> bool {
    field.split(',').any(|item| {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };
        (range == "*" || range == "?") && step.is_none_or(|step| step.trim() == "1")
    })
}

fn any_to_star(field: &str) -> String {
    field
        .split(',')
        .map(|item| match item.strip_prefix('?') {
            Some(rest) => format!("*{rest}"),
            None => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Expand a 0-7 day-of-week field into explicit day names.
fn translate_dow(field: &str) -> Result<String, ScheduleError> {
    if field == "*" || field == "?" {
        return Ok("*".to_string());
    }

    let invalid = || ScheduleError::DayOfWeek(field.to_string());
    let mut days = BTreeSet::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = if range == "*" || range == "?" {
            (0, 6)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (day_value(lo).ok_or_else(invalid)?, day_value(hi).ok_or_else(invalid)?)
        } else {
            let value = day_value(range).ok_or_else(invalid)?;
            // `N/step` runs from N to the end of the week.
            (value, if step.is_some() { 6 } else { value })
        };
        if start > end {
            return Err(invalid());
        }

        let mut day = start;
        while day <= end {
            days.insert(day % 7);
            day += step.unwrap_or(1);
        }
    }

    Ok(days
        .into_iter()
        .map(|d| DAY_NAMES[d as usize])
        .collect::<Vec<_>>()
        .join(","))
}

fn day_value(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return (n <= 7).then_some(n);
    }
    DAY_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
        .map(|i| i as u32)
}

/// Parse `@every` durations such as `90s`, `1h30m` or `1.5h`.
///
/// Sub-second parts are truncated and the result is at least one second.
fn parse_every(input: &str) -> Result<Duration, ScheduleError> {
    let invalid = || ScheduleError::Every(input.to_string());
    if input.is_empty() {
        return Err(invalid());
    }

    let mut total = 0f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total += value * seconds_per_unit;
    }

    Ok(Duration::from_secs((total.floor() as u64).max(1)))
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
