//! Resident check loop.
//!
//! The guard is also evaluated on inbound HTTP triggers; this loop is the
//! self-trigger that covers deployments where nobody opens the dashboard
//! early in the month.

use std::time::Duration;

use chrono::{Datelike, Utc};
use tracing::info;

use crate::extrato::dispatcher::Dispatcher;
use crate::extrato::guard::should_run_monthly_extrato;
use crate::extrato::run_log::RunLog;

/// Periodically evaluate the guard and dispatch generation when due.
/// The first check happens immediately on startup.
pub async fn run_check_loop(
    run_log: RunLog,
    dispatcher: Dispatcher,
    min_day_of_month: u32,
    check_interval_hours: u64,
) {
    info!(check_interval_hours, "extrato check loop started");

    // interval() panics on a zero period
    let mut interval =
        tokio::time::interval(Duration::from_secs(check_interval_hours.max(1) * 3600));

    loop {
        interval.tick().await;

        let now = Utc::now();
        if should_run_monthly_extrato(now, &run_log, min_day_of_month) {
            info!(month = now.month(), year = now.year(), "monthly extrato due");
            dispatcher.dispatch(now.month(), now.year()).await;
        }
    }
}
