use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::Repositories;
use crate::services::EventService;
use crate::uploads::LocalImageStore;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventService>,
}

impl AppState {
    pub fn new(events: EventService) -> Self {
        Self {
            events: Arc::new(events),
        }
    }

    /// Postgres repositories with images on the local filesystem.
    pub fn postgres(pool: PgPool, config: &Config) -> Self {
        let images = LocalImageStore::new(config.upload_policy());
        Self::new(EventService::new(
            Repositories::postgres(pool),
            Arc::new(images),
        ))
    }
}
