//! Schedule engine
//!
//! Pure computation of "when does a job next become due" over three
//! variants: a one-shot date, a fixed interval, and a cron expression.
//! Schedules are immutable once constructed and are serialized as a tagged
//! union so the stored form stays schema-stable:
//!
//! ```json
//! {"type": "oneshot", "date": "2026-09-01T00:00:00Z"}
//! {"type": "interval", "period_secs": 60}
//! {"type": "cron", "expression": "0 30 9 * * Mon-Fri"}
//! ```

use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fired one-shot schedule reports its next activation this far in the
/// future, which means it is due exactly once and never reactivated.
const ONESHOT_SENTINEL_YEARS: u32 = 69;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("interval period of {period_secs}s is out of range")]
    IntervalOutOfRange { period_secs: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schedule {
    /// Runs once at `date`, never again.
    Oneshot { date: DateTime<Utc> },
    /// Runs every `period_secs` seconds, aligned to whole-second boundaries.
    Interval { period_secs: u64 },
    /// Six-field cron expression (seconds minutes hours day-of-month month
    /// day-of-week), standard cron matching semantics.
    Cron { expression: String },
}

impl Schedule {
    /// One-shot schedule at the given date.
    pub fn at(date: DateTime<Utc>) -> Self {
        Schedule::Oneshot { date }
    }

    /// Recurring schedule every `period`. Periods below one second are
    /// clamped up to one second; sub-second remainders are dropped.
    pub fn every(period: StdDuration) -> Self {
        Schedule::Interval {
            period_secs: period.as_secs().max(1),
        }
    }

    /// Cron schedule from an expression string. The expression is validated
    /// at job-write time via [`Schedule::validate`], not here.
    pub fn cron(expression: impl Into<String>) -> Self {
        Schedule::Cron {
            expression: expression.into(),
        }
    }

    /// Next activation strictly derived from `from`. Pure; drives both
    /// validation and dispatch.
    pub fn next(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Schedule::Oneshot { date } => {
                if *date > from {
                    *date
                } else {
                    far_future(from)
                }
            }
            Schedule::Interval { period_secs } => {
                let subsec = Duration::nanoseconds(i64::from(from.timestamp_subsec_nanos()));
                interval_period((*period_secs).max(1))
                    .and_then(|period| from.checked_add_signed(period - subsec))
                    .unwrap_or_else(|| far_future(from))
            }
            Schedule::Cron { expression } => cron::Schedule::from_str(expression)
                .ok()
                .and_then(|s| s.after(&from).next())
                .unwrap_or_else(|| far_future(from)),
        }
    }

    /// Checks the schedule is well formed. Cron parse failures surface here
    /// so a bad expression is rejected when the job is written, not when it
    /// is dispatched.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self {
            Schedule::Oneshot { .. } => Ok(()),
            Schedule::Interval { period_secs } => {
                // Periods chrono cannot represent would otherwise surface as
                // arithmetic failures inside next().
                match interval_period((*period_secs).max(1)) {
                    Some(_) => Ok(()),
                    None => Err(ScheduleError::IntervalOutOfRange {
                        period_secs: *period_secs,
                    }),
                }
            }
            Schedule::Cron { expression } => match cron::Schedule::from_str(expression) {
                Ok(_) => Ok(()),
                Err(e) => Err(ScheduleError::InvalidCron {
                    expression: expression.clone(),
                    reason: e.to_string(),
                }),
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Schedule::Oneshot { date } => format!("@{}", date.to_rfc3339()),
            Schedule::Interval { period_secs } => format!("every {}s", (*period_secs).max(1)),
            Schedule::Cron { expression } => format!("cron {expression}"),
        }
    }
}

fn far_future(from: DateTime<Utc>) -> DateTime<Utc> {
    from.checked_add_months(Months::new(ONESHOT_SENTINEL_YEARS * 12))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A period as a chrono duration, or `None` when it exceeds what chrono can
/// represent (including periods past `i64::MAX` seconds).
fn interval_period(period_secs: u64) -> Option<Duration> {
    i64::try_from(period_secs).ok().and_then(Duration::try_seconds)
}
