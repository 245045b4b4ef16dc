//! Datetime operators.
//!
//! Record values must be date strings (see [`crate::value::parse_date`]);
//! anything else fails every operator here. All calendar arithmetic is in UTC.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde_json::Value;

use super::EvalContext;
use crate::error::{FilterError, Result};
use crate::op::Op;
use crate::value::as_date;

const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;

/// A relative window such as "the last 2 days and 6 hours".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelativeTimeQuery {
    pub days: f64,
    pub hours: f64,
    pub minutes: f64,
}

impl RelativeTimeQuery {
    pub fn window_ms(&self) -> i64 {
        (self.days * MS_PER_DAY + self.hours * MS_PER_HOUR + self.minutes * MS_PER_MINUTE) as i64
    }
}

/// Inclusive hour-of-day range. `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDayQuery {
    pub start: u32,
    pub end: u32,
}

impl TimeOfDayQuery {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour <= self.end
        } else {
            hour >= self.start || hour <= self.end
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgeUnit {
    #[default]
    Years,
    Months,
    Days,
}

impl AgeUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "years" | "year" => Some(AgeUnit::Years),
            "months" | "month" => Some(AgeUnit::Months),
            "days" | "day" => Some(AgeUnit::Days),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgeQuery {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: AgeUnit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DateTimeQuery {
    Recent(RelativeTimeQuery),
    Upcoming(RelativeTimeQuery),
    /// Day numbers, 0 = Sunday.
    DayOfWeek(Vec<u32>),
    TimeOfDay(TimeOfDayQuery),
    Age(AgeQuery),
    IsWeekday(bool),
    IsWeekend(bool),
    IsBefore(DateTime<Utc>),
    IsAfter(DateTime<Utc>),
}

pub fn parse(op: Op, payload: &Value) -> Result<DateTimeQuery> {
    match op {
        Op::Recent | Op::Upcoming => {
            let map = super::expect_object(op, payload)?;
            let query = RelativeTimeQuery {
                days: super::optional_number(op, map, "days")?.unwrap_or(0.0),
                hours: super::optional_number(op, map, "hours")?.unwrap_or(0.0),
                minutes: super::optional_number(op, map, "minutes")?.unwrap_or(0.0),
            };
            if query.window_ms() <= 0 {
                return Err(FilterError::operator(
                    op.as_str(),
                    "needs a positive 'days', 'hours' or 'minutes'",
                ));
            }
            Ok(if op == Op::Recent {
                DateTimeQuery::Recent(query)
            } else {
                DateTimeQuery::Upcoming(query)
            })
        }
        Op::DayOfWeek => {
            let days = super::expect_array(op, payload)?
                .iter()
                .map(|d| match d.as_u64() {
                    Some(n) if n <= 6 => Ok(n as u32),
                    _ => Err(FilterError::operator(
                        op.as_str(),
                        format!("day numbers must be integers 0-6, got {}", d),
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(DateTimeQuery::DayOfWeek(days))
        }
        Op::TimeOfDay => {
            let map = super::expect_object(op, payload)?;
            let hour = |key: &str| match map.get(key).and_then(Value::as_u64) {
                Some(h) if h <= 23 => Ok(h as u32),
                _ => Err(FilterError::operator(
                    op.as_str(),
                    format!("'{}' must be an hour between 0 and 23", key),
                )),
            };
            Ok(DateTimeQuery::TimeOfDay(TimeOfDayQuery {
                start: hour("start")?,
                end: hour("end")?,
            }))
        }
        Op::Age => {
            let map = super::expect_object(op, payload)?;
            let unit = match map.get("unit") {
                None | Some(Value::Null) => AgeUnit::default(),
                Some(Value::String(s)) => AgeUnit::parse(s).ok_or_else(|| {
                    FilterError::operator(
                        op.as_str(),
                        format!("unknown unit '{}', expected years, months or days", s),
                    )
                })?,
                Some(other) => {
                    return Err(FilterError::operator(
                        op.as_str(),
                        format!("'unit' must be a string, got {}", other),
                    ))
                }
            };
            let query = AgeQuery {
                min: super::optional_number(op, map, "min")?,
                max: super::optional_number(op, map, "max")?,
                unit,
            };
            if let (Some(min), Some(max)) = (query.min, query.max) {
                if min > max {
                    return Err(FilterError::operator(
                        op.as_str(),
                        format!("'min' ({}) is greater than 'max' ({})", min, max),
                    ));
                }
            }
            Ok(DateTimeQuery::Age(query))
        }
        Op::IsWeekday => Ok(DateTimeQuery::IsWeekday(super::expect_bool(op, payload)?)),
        Op::IsWeekend => Ok(DateTimeQuery::IsWeekend(super::expect_bool(op, payload)?)),
        Op::IsBefore => Ok(DateTimeQuery::IsBefore(super::expect_date(op, payload)?)),
        _ => Ok(DateTimeQuery::IsAfter(super::expect_date(op, payload)?)),
    }
}

/// Tests a record value. An array holds if any of its dates does.
pub fn evaluate(query: &DateTimeQuery, actual: &Value, ctx: &EvalContext) -> bool {
    if let Value::Array(items) = actual {
        return items.iter().any(|item| evaluate(query, item, ctx));
    }
    let Some(date) = as_date(actual) else {
        return false;
    };
    match query {
        DateTimeQuery::Recent(window) => {
            let delta = (ctx.now() - date).num_milliseconds();
            delta >= 0 && delta <= window.window_ms()
        }
        DateTimeQuery::Upcoming(window) => {
            let delta = (date - ctx.now()).num_milliseconds();
            delta >= 0 && delta <= window.window_ms()
        }
        DateTimeQuery::DayOfWeek(days) => days.contains(&date.weekday().num_days_from_sunday()),
        DateTimeQuery::TimeOfDay(range) => range.contains(date.hour()),
        DateTimeQuery::Age(age) => {
            let Some(elapsed) = elapsed_in(age.unit, date, ctx.now()) else {
                return false;
            };
            age.min.map_or(true, |min| elapsed >= min) && age.max.map_or(true, |max| elapsed <= max)
        }
        DateTimeQuery::IsWeekday(expected) => !is_weekend(date) == *expected,
        DateTimeQuery::IsWeekend(expected) => is_weekend(date) == *expected,
        DateTimeQuery::IsBefore(bound) => date < *bound,
        DateTimeQuery::IsAfter(bound) => date > *bound,
    }
}

fn is_weekend(date: DateTime<Utc>) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Whole units elapsed from `from` to `now`. Future dates have no age.
fn elapsed_in(unit: AgeUnit, from: DateTime<Utc>, now: DateTime<Utc>) -> Option<f64> {
    if from > now {
        return None;
    }
    Some(match unit {
        AgeUnit::Days => (now - from).num_days() as f64,
        AgeUnit::Months => whole_months(from, now) as f64,
        AgeUnit::Years => (whole_months(from, now) / 12) as f64,
    })
}

fn whole_months(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let mut months = (now.year() - from.year()) as i64 * 12 + now.month() as i64 - from.month() as i64;
    let not_reached = (now.day(), now.time()) < (from.day(), from.time());
    if not_reached {
        months -= 1;
    }
    months.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_at(now: &str) -> EvalContext {
        EvalContext {
            case_sensitive: false,
            fixed_now: crate::value::parse_date(now),
        }
    }

    fn check(op: Op, payload: Value, actual: Value, now: &str) -> bool {
        let query = parse(op, &payload).unwrap();
        evaluate(&query, &actual, &ctx_at(now))
    }

    const NOW: &str = "2024-06-15T12:00:00Z";

    #[test]
    fn recent_rejects_future_dates() {
        let p = json!({"days": 7});
        assert!(check(Op::Recent, p.clone(), json!("2024-06-10T12:00:00Z"), NOW));
        assert!(!check(Op::Recent, p.clone(), json!("2024-06-01T12:00:00Z"), NOW));
        assert!(!check(Op::Recent, p, json!("2024-06-16T12:00:00Z"), NOW));
    }

    #[test]
    fn upcoming_rejects_past_dates() {
        let p = json!({"hours": 3});
        assert!(check(Op::Upcoming, p.clone(), json!("2024-06-15T14:30:00Z"), NOW));
        assert!(!check(Op::Upcoming, p.clone(), json!("2024-06-15T11:00:00Z"), NOW));
        assert!(!check(Op::Upcoming, p, json!("2024-06-15T16:00:00Z"), NOW));
    }

    #[test]
    fn relative_window_must_be_positive() {
        assert!(parse(Op::Recent, &json!({})).is_err());
        assert!(parse(Op::Recent, &json!({"days": 0})).is_err());
        assert!(parse(Op::Recent, &json!({"days": -1})).is_err());
    }

    #[test]
    fn day_of_week_uses_sunday_zero() {
        // 2024-06-15 is a Saturday, 2024-06-16 a Sunday.
        assert!(check(Op::DayOfWeek, json!([6]), json!("2024-06-15"), NOW));
        assert!(check(Op::DayOfWeek, json!([0, 1]), json!("2024-06-16"), NOW));
        assert!(!check(Op::DayOfWeek, json!([1, 2, 3]), json!("2024-06-16"), NOW));
        assert!(parse(Op::DayOfWeek, &json!([7])).is_err());
    }

    #[test]
    fn time_of_day_wraps_midnight() {
        let night = json!({"start": 22, "end": 6});
        assert!(check(Op::TimeOfDay, night.clone(), json!("2024-06-15T23:15:00Z"), NOW));
        assert!(check(Op::TimeOfDay, night.clone(), json!("2024-06-15T05:59:00Z"), NOW));
        assert!(!check(Op::TimeOfDay, night, json!("2024-06-15T12:00:00Z"), NOW));

        let office = json!({"start": 9, "end": 17});
        assert!(check(Op::TimeOfDay, office.clone(), json!("2024-06-15T17:30:00Z"), NOW));
        assert!(!check(Op::TimeOfDay, office, json!("2024-06-15T18:00:00Z"), NOW));
    }

    #[test]
    fn age_in_years_uses_calendar() {
        let adult = json!({"min": 18});
        assert!(check(Op::Age, adult.clone(), json!("2006-06-15"), NOW));
        assert!(!check(Op::Age, adult, json!("2006-06-16"), NOW));

        let thirties = json!({"min": 30, "max": 39, "unit": "years"});
        assert!(check(Op::Age, thirties.clone(), json!("1990-01-01"), NOW));
        assert!(!check(Op::Age, thirties, json!("1980-01-01"), NOW));
    }

    #[test]
    fn age_in_months_and_days() {
        assert!(check(Op::Age, json!({"max": 5, "unit": "months"}), json!("2024-01-20"), NOW));
        assert!(!check(Op::Age, json!({"max": 4, "unit": "months"}), json!("2024-01-10"), NOW));
        assert!(check(Op::Age, json!({"min": 10, "max": 10, "unit": "days"}), json!("2024-06-05T12:00:00Z"), NOW));
        assert!(parse(Op::Age, &json!({"unit": "weeks"})).is_err());
        assert!(parse(Op::Age, &json!({"min": 5, "max": 1})).is_err());
    }

    #[test]
    fn weekday_and_weekend() {
        assert!(check(Op::IsWeekend, json!(true), json!("2024-06-15"), NOW));
        assert!(!check(Op::IsWeekday, json!(true), json!("2024-06-15"), NOW));
        assert!(check(Op::IsWeekday, json!(true), json!("2024-06-17"), NOW));
        assert!(check(Op::IsWeekday, json!(false), json!("2024-06-16"), NOW));
    }

    #[test]
    fn before_and_after() {
        assert!(check(Op::IsBefore, json!("2024-01-01"), json!("2023-12-31T23:59:59Z"), NOW));
        assert!(!check(Op::IsBefore, json!("2024-01-01"), json!("2024-01-01"), NOW));
        assert!(check(Op::IsAfter, json!("2024-01-01"), json!("2024-01-01T00:00:01Z"), NOW));
        assert!(parse(Op::IsAfter, &json!(20240101)).is_err());
    }

    #[test]
    fn non_dates_never_match() {
        let q = parse(Op::IsWeekend, &json!(true)).unwrap();
        let ctx = ctx_at(NOW);
        assert!(!evaluate(&q, &json!(1718445600), &ctx));
        assert!(!evaluate(&q, &json!("saturday"), &ctx));
        assert!(!evaluate(&q, &Value::Null, &ctx));
    }

    #[test]
    fn arrays_match_any_date() {
        let q = parse(Op::IsWeekend, &json!(true)).unwrap();
        let ctx = ctx_at(NOW);
        assert!(evaluate(&q, &json!(["2024-06-17", "2024-06-15"]), &ctx));
        assert!(!evaluate(&q, &json!(["2024-06-17", "saturday"]), &ctx));
        assert!(!evaluate(&q, &json!([]), &ctx));
    }
}
