//! Run-guard: decides whether this month's statement generation is due.

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, warn};

use crate::extrato::run_log::RunLog;

/// Whether monthly generation should run at `now`.
///
/// The clock is an explicit parameter so callers (HTTP handler, CLI, check
/// loop) pass `Utc::now()` at the edge and tests pass fixed dates.
///
/// Returns false before `min_day_of_month` (early-month rule) and when a
/// success row already exists for the current month. A run-log read failure
/// fails open: a missed monthly statement is worse than an occasional
/// duplicate attempt.
pub fn should_run_monthly_extrato(
    now: DateTime<Utc>,
    run_log: &RunLog,
    min_day_of_month: u32,
) -> bool {
    if now.day() < min_day_of_month {
        debug!(
            day = now.day(),
            min_day = min_day_of_month,
            "too early in the month for statement generation"
        );
        return false;
    }

    match run_log.find_success(now.month(), now.year()) {
        Ok(Some(_)) => false,
        Ok(None) => true,
        Err(e) => {
            warn!(
                month = now.month(),
                year = now.year(),
                error = %e,
                "run-log lookup failed, allowing generation"
            );
            true
        }
    }
}
