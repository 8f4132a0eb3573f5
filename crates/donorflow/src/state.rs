use std::sync::Arc;

use donorflow_core::store::DonorStore;
use donorflow_core::upload::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DonorStore>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn DonorStore>) -> Self {
        Self {
            store,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}
