use std::sync::Arc;
use std::time::Instant;

use crate::services::feedback_service::FeedbackNotifier;
use crate::services::sizing_service::SizingService;

/// Everything handlers need. All parts are immutable or internally
/// synchronized, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub sizing: SizingService,
    pub feedback: Arc<dyn FeedbackNotifier>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(sizing: SizingService, feedback: Arc<dyn FeedbackNotifier>) -> Self {
        Self {
            sizing,
            feedback,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
