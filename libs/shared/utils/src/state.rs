use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::Database;

use crate::clock::{Clock, SystemClock};
use crate::notification::{notifier_from_config, NotificationPort};

/// Everything a request handler needs to build the scheduling services.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub notifier: Arc<dyn NotificationPort>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        let notifier = notifier_from_config(&config);
        Self {
            config: Arc::new(config),
            db,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_parts(
        config: AppConfig,
        db: Database,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db,
            notifier,
            clock,
        }
    }
}
