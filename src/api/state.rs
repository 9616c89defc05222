use crate::extrato::{Dispatcher, RunLog};
use crate::storage::Pool;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub run_log: RunLog,
    pub dispatcher: Dispatcher,
    pub min_day_of_month: u32,
}
