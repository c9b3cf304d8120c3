//! Cron next-run arithmetic.
//!
//! The applet surface speaks standard 5-field cron
//! (`minute hour day-of-month month day-of-week`) plus the common
//! descriptors (`@hourly`, `@daily`, `@weekly`, `@monthly`, `@yearly`).
//! The `cron` crate wants a seconds field, so 5-field expressions are
//! normalized by prepending `0` before parsing. Everything is UTC.

use cap_core::{CapabilityError, CapabilityResult};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Normalize an applet-facing cron expression to the 6-field grammar.
///
/// Seconds-bearing expressions are rejected: the applet surface is
/// 5-field by contract, and silently accepting 6 fields would shift
/// every column's meaning.
fn normalize(expr: &str) -> CapabilityResult<String> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(CapabilityError::invalid("cron expression must not be empty"));
    }
    if trimmed.starts_with('@') {
        return Ok(trimmed.to_string());
    }
    let fields = trimmed.split_whitespace().count();
    if fields != 5 {
        return Err(CapabilityError::invalid(format!(
            "cron expression must have 5 fields, got {fields}: {trimmed:?}"
        )));
    }
    Ok(format!("0 {trimmed}"))
}

/// Pure function `(cron_expr, from_utc) → next_utc`.
///
/// The result is strictly after `from`.
pub fn next_run(expr: &str, from: DateTime<Utc>) -> CapabilityResult<DateTime<Utc>> {
    let normalized = normalize(expr)?;
    let schedule = Schedule::from_str(&normalized)
        .map_err(|e| CapabilityError::invalid(format!("invalid cron expression {expr:?}: {e}")))?;
    schedule
        .after(&from)
        .next()
        .ok_or_else(|| CapabilityError::invalid(format!("cron expression {expr:?} never fires")))
}

/// Validate an expression without computing anything.
pub fn validate(expr: &str) -> CapabilityResult<()> {
    let normalized = normalize(expr)?;
    Schedule::from_str(&normalized)
        .map_err(|e| CapabilityError::invalid(format!("invalid cron expression {expr:?}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn every_five_minutes_is_deterministic() {
        let from = at(2026, 2, 12, 10, 15, 0);
        let next = next_run("*/5 * * * *", from).unwrap();
        assert_eq!(next, at(2026, 2, 12, 10, 20, 0));
    }

    #[test]
    fn next_run_is_strictly_after_from() {
        // 10:15:00 itself matches */5, but the next run must move on.
        let from = at(2026, 2, 12, 10, 15, 0);
        let next = next_run("*/5 * * * *", from).unwrap();
        assert!(next > from);
    }

    #[test]
    fn hourly_descriptor() {
        let from = at(2026, 2, 12, 10, 15, 30);
        let next = next_run("@hourly", from).unwrap();
        assert_eq!(next, at(2026, 2, 12, 11, 0, 0));
    }

    #[test]
    fn daily_crosses_midnight() {
        let from = at(2026, 2, 12, 23, 59, 59);
        let next = next_run("0 0 * * *", from).unwrap();
        assert_eq!(next, at(2026, 2, 13, 0, 0, 0));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            next_run("not-a-cron", Utc::now()).unwrap_err(),
            CapabilityError::Invalid(_)
        ));
    }

    #[test]
    fn six_fields_are_rejected() {
        // Seconds are not part of the applet-facing grammar.
        assert!(validate("0 */5 * * * *").is_err());
    }

    #[test]
    fn empty_is_rejected() {
        assert!(validate("   ").is_err());
    }
}
