use crate::{config::Config, services::payroll::PayrollService, store::PayrollStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PayrollStore>,
    pub payroll: Arc<PayrollService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn PayrollStore>, config: Config) -> Self {
        Self {
            payroll: Arc::new(PayrollService::new(Arc::clone(&store))),
            store,
            config: Arc::new(config),
        }
    }
}
