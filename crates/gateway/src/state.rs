use crate::metrics::RequestMetrics;
use inference::Detect;
use std::sync::Arc;

/// Process-scoped state handed to every handler. The detector is loaded once
/// at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn Detect>,
    pub metrics: Arc<RequestMetrics>,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detect>) -> Self {
        Self {
            detector,
            metrics: Arc::new(RequestMetrics::default()),
        }
    }
}
