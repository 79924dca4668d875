//! Retention durations written as `<integer> hours` or `<integer> days`

use crate::error::{Result, SzbckError};
use chrono::TimeDelta;

/// Unit word for hours
pub const UNIT_HOURS: &str = "hours";

/// Unit word for days
pub const UNIT_DAYS: &str = "days";

/// Parse a retention duration for `key` and enforce a minimum
///
/// # Errors
///
/// - [`SzbckError::InvalidRetention`] if the value is malformed, uses an
///   unknown unit, overflows, or is shorter than `min_hours`
pub fn parse_retention(key: &'static str, value: &str, min_hours: i64) -> Result<TimeDelta> {
    let invalid = |reason: String| SzbckError::InvalidRetention {
        key,
        value: value.to_string(),
        reason,
    };

    let (amount, unit) = value
        .split_once(' ')
        .ok_or_else(|| invalid(format!("expected '<amount> {UNIT_HOURS}|{UNIT_DAYS}'")))?;
    let amount: i64 = amount
        .parse()
        .map_err(|_| invalid(format!("'{amount}' is not a whole number")))?;

    let delta = match unit.trim() {
        UNIT_HOURS => TimeDelta::try_hours(amount),
        UNIT_DAYS => TimeDelta::try_days(amount),
        other => {
            return Err(invalid(format!(
                "unit '{other}' must be '{UNIT_HOURS}' or '{UNIT_DAYS}'"
            )))
        }
    }
    .ok_or_else(|| invalid("out of range".to_string()))?;

    if delta < TimeDelta::hours(min_hours) {
        return Err(invalid(format!("must be at least {min_hours} hours")));
    }

    Ok(delta)
}
