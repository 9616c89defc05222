//! Fire-and-forget dispatch of statement generation.
//!
//! HTTP handlers that trigger generation must return promptly, so the work
//! normally runs on a detached worker task. Synchronous mode exists for
//! tests and CLI diagnostics where deterministic completion is required.
//! No retry, no backoff, no cancellation; a log line is the only failure
//! signal either way.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::extrato::generator::ExtratoGenerator;

#[derive(Clone)]
pub struct Dispatcher {
    generator: Arc<dyn ExtratoGenerator>,
    permits: Arc<Semaphore>,
    disable_background: bool,
}

impl Dispatcher {
    /// `max_concurrent_runs` bounds in-flight background generations;
    /// excess workers wait for a permit rather than piling up.
    pub fn new(
        generator: Arc<dyn ExtratoGenerator>,
        max_concurrent_runs: usize,
        disable_background: bool,
    ) -> Self {
        Self {
            generator,
            permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
            disable_background,
        }
    }

    /// Invoke the generator once for `(month, year)`.
    ///
    /// In background mode this returns before generation completes; the
    /// worker logs its own outcome. In synchronous mode the call returns
    /// after the generator finished, still swallowing its errors.
    pub async fn dispatch(&self, month: u32, year: i32) {
        if self.disable_background {
            self.run_once(month, year).await;
            return;
        }

        let generator = Arc::clone(&self.generator);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed, process shutting down
            };
            match generator.generate(month, year).await {
                Ok(extrato) => {
                    info!(month, year, net_cents = extrato.net_cents, "background extrato run finished")
                }
                Err(e) => error!(month, year, error = %e, "background extrato run failed"),
            }
        });
    }

    /// Run the generator to completion on the caller's task, regardless of
    /// the background flag. Errors are logged, never propagated.
    pub async fn dispatch_sync(&self, month: u32, year: i32) {
        self.run_once(month, year).await;
    }

    async fn run_once(&self, month: u32, year: i32) {
        match self.generator.generate(month, year).await {
            Ok(extrato) => {
                info!(month, year, net_cents = extrato.net_cents, "extrato run finished")
            }
            Err(e) => error!(month, year, error = %e, "extrato run failed"),
        }
    }
}
