//! Storage contracts for each entity owned or read by the event core.
//!
//! Every trait has a Postgres implementation in [`postgres`] and an
//! in-process implementation in [`memory`] used by tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{
    Category, CategoryId, Event, EventHost, EventId, LikeState, Location, LocationId, NewEvent,
    User, UserId,
};
use crate::utils::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;

/// Read-only access to locations and categories.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// Exact match on the description column.
    async fn location_by_name(&self, name: &str) -> AppResult<Option<Location>>;

    /// Exact match on the description column.
    async fn category_by_name(&self, name: &str) -> AppResult<Option<Category>>;

    async fn locations_by_ids(&self, ids: &[LocationId]) -> AppResult<Vec<Location>>;

    async fn categories_by_ids(&self, ids: &[CategoryId]) -> AppResult<Vec<Category>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert an event without host attribution.
    async fn insert(&self, event: &NewEvent) -> AppResult<Event>;

    /// Insert an event and its host row atomically.
    ///
    /// Either both rows are written or neither is.
    async fn insert_hosted(&self, event: &NewEvent, host: UserId) -> AppResult<Event>;

    async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>>;

    /// All events ordered by id.
    async fn find_all(&self) -> AppResult<Vec<Event>>;

    /// Events whose id is in `ids`, ordered by id. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[EventId]) -> AppResult<Vec<Event>>;

    async fn find_by_category(&self, category_id: CategoryId) -> AppResult<Vec<Event>>;
}

#[async_trait]
pub trait HostRepository: Send + Sync {
    /// Record `user_id` as the host of `event_id`.
    ///
    /// Returns the host stored for the event after the call, which differs
    /// from `user_id` when the event was already attributed to someone else.
    async fn attribute(&self, event_id: EventId, user_id: UserId) -> AppResult<UserId>;

    async fn events_hosted_by(&self, user_id: UserId) -> AppResult<Vec<EventId>>;

    async fn hosts_of(&self, event_id: EventId) -> AppResult<Vec<UserId>>;

    async fn hosts_for(&self, event_ids: &[EventId]) -> AppResult<Vec<EventHost>>;

    /// Events with no host row, ordered by id.
    async fn orphaned_events(&self) -> AppResult<Vec<EventId>>;
}

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Flip the like state of the pair in one atomic step.
    async fn toggle(&self, user_id: UserId, event_id: EventId) -> AppResult<LikeState>;

    /// Force the pair into `state`. Idempotent.
    async fn set(&self, user_id: UserId, event_id: EventId, state: LikeState) -> AppResult<()>;

    async fn count_for_event(&self, event_id: EventId) -> AppResult<i64>;
}

/// The full set of repositories the services are wired with.
#[derive(Clone)]
pub struct Repositories {
    pub references: Arc<dyn ReferenceRepository>,
    pub users: Arc<dyn UserRepository>,
    pub events: Arc<dyn EventRepository>,
    pub hosts: Arc<dyn HostRepository>,
    pub likes: Arc<dyn LikeRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            references: Arc::new(postgres::PostgresReferenceRepository::new(pool.clone())),
            users: Arc::new(postgres::PostgresUserRepository::new(pool.clone())),
            events: Arc::new(postgres::PostgresEventRepository::new(pool.clone())),
            hosts: Arc::new(postgres::PostgresHostRepository::new(pool.clone())),
            likes: Arc::new(postgres::PostgresLikeRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            references: store.clone(),
            users: store.clone(),
            events: store.clone(),
            hosts: store.clone(),
            likes: store,
        }
    }
}
