use std::sync::Arc;

use crate::dataset::DatasetStore;
use crate::model::Predictor;

/// Everything loaded at startup. Built once in `main`, then shared read-only
/// with every request handler.
#[derive(Clone)]
pub struct DashboardContext {
    pub store: DatasetStore,
    pub predictor: Arc<dyn Predictor>,
}

impl DashboardContext {
    pub fn new(store: DatasetStore, predictor: Arc<dyn Predictor>) -> Self {
        Self { store, predictor }
    }
}
