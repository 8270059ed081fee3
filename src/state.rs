use std::sync::Arc;

use crate::database::PlatformStore;
use crate::services::mailer::Mailer;
use crate::services::registration_service::ActivityLocks;

/// Everything the HTTP layer needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlatformStore>,
    pub mailer: Arc<dyn Mailer>,
    pub locks: Arc<ActivityLocks>,
}

impl AppState {
    pub fn new(store: Arc<dyn PlatformStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            locks: Arc::new(ActivityLocks::new()),
        }
    }
}
