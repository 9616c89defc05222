//! extratod -- monthly statement (extrato) generation for studio bookkeeping.
//!
//! This crate provides the run-guard that decides when the monthly
//! statement is due, the fire-and-forget dispatcher that executes it, the
//! persisted run log backing both, and the HTTP/CLI trigger surfaces.

pub mod api;
pub mod config;
pub mod extrato;
pub mod storage;

use std::sync::Arc;

use anyhow::Result;

use crate::api::state::AppState;
use crate::config::Config;
use crate::extrato::{engine, Dispatcher, LedgerGenerator, RunLog};

/// Start the extratod daemon: API server plus the resident check loop.
pub async fn serve(bind: &str, config: Config) -> Result<()> {
    // 1. Initialize Storage
    tracing::info!(db_path = %config.storage.db_path, "Initializing database");
    let pool = storage::open_pool(&config.storage.db_path)?;

    // 2. Wire up the extrato pipeline
    let run_log = RunLog::new(pool.clone());
    let generator = Arc::new(LedgerGenerator::new(pool.clone(), run_log.clone()));
    let dispatcher = Dispatcher::new(
        generator,
        config.extrato.max_concurrent_runs,
        config.extrato.disable_background,
    );

    // 3. Start the check loop (background task)
    tokio::spawn(engine::run_check_loop(
        run_log.clone(),
        dispatcher.clone(),
        config.extrato.min_day_of_month,
        config.extrato.check_interval_hours,
    ));

    // 4. Start API Server
    let state = AppState {
        pool,
        run_log,
        dispatcher,
        min_day_of_month: config.extrato.min_day_of_month,
    };
    let addr: std::net::SocketAddr = bind.parse()?;
    let app = api::router(state);

    tracing::info!(%addr, "extratod listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
