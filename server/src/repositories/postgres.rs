//! PostgreSQL implementations of the repository traits.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{EventRepository, HostRepository, LikeRepository, ReferenceRepository, UserRepository};
use crate::models::{
    Category, CategoryId, Event, EventHost, EventId, LikeState, Location, LocationId, NewEvent,
    User, UserId,
};
use crate::utils::{AppError, AppResult, Resource};

const EVENT_COLUMNS: &str =
    "id, title, description, location_id, address, start_date, end_date, image, category_id";

/// Foreign keys each table can violate, and the entity each points at.
const EVENT_REFERENCES: &[(&str, Resource)] = &[
    ("events_location_id_fkey", Resource::Location),
    ("events_category_id_fkey", Resource::Category),
];
const HOST_REFERENCES: &[(&str, Resource)] = &[
    ("event_hosts_event_id_fkey", Resource::Event),
    ("event_hosts_user_id_fkey", Resource::User),
];
const LIKE_REFERENCES: &[(&str, Resource)] = &[
    ("event_likes_event_id_fkey", Resource::Event),
    ("event_likes_user_id_fkey", Resource::User),
];

/// Map a foreign key violation onto the entity its constraint points at.
/// Anything else, including unknown constraints, stays a database error.
fn missing_reference(err: sqlx::Error, references: &[(&str, Resource)]) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            let resource = references
                .iter()
                .find(|(constraint, _)| db.constraint() == Some(*constraint))
                .map(|(_, resource)| *resource);
            if let Some(resource) = resource {
                return AppError::NotFound(resource);
            }
        }
    }
    AppError::Database(err)
}

pub struct PostgresReferenceRepository {
    pool: PgPool,
}

impl PostgresReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceRepository for PostgresReferenceRepository {
    async fn location_by_name(&self, name: &str) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, description FROM locations WHERE description = $1 LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    async fn category_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, description FROM categories WHERE description = $1 LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn locations_by_ids(&self, ids: &[LocationId]) -> AppResult<Vec<Location>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, description FROM locations WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    async fn categories_by_ids(&self, ids: &[CategoryId]) -> AppResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, description FROM categories WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, surname, username, profile_picture FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, surname, username, profile_picture FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn insert_sql() -> String {
        format!(
            "INSERT INTO events (title, description, location_id, address, start_date, end_date, image, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            EVENT_COLUMNS
        )
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: &NewEvent) -> AppResult<Event> {
        let sql = Self::insert_sql();
        let created = sqlx::query_as::<_, Event>(&sql)
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.location_id)
            .bind(&event.address)
            .bind(event.start_date)
            .bind(event.end_date)
            .bind(&event.image)
            .bind(event.category_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| missing_reference(e, EVENT_REFERENCES))?;
        Ok(created)
    }

    async fn insert_hosted(&self, event: &NewEvent, host: UserId) -> AppResult<Event> {
        let sql = Self::insert_sql();
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Event>(&sql)
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.location_id)
            .bind(&event.address)
            .bind(event.start_date)
            .bind(event.end_date)
            .bind(&event.image)
            .bind(event.category_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| missing_reference(e, EVENT_REFERENCES))?;

        sqlx::query("INSERT INTO event_hosts (event_id, user_id) VALUES ($1, $2)")
            .bind(created.id)
            .bind(host)
            .execute(&mut *tx)
            .await
            .map_err(|e| missing_reference(e, HOST_REFERENCES))?;

        tx.commit().await?;

        debug!(event_id = created.id, user_id = host, "Inserted hosted event");
        Ok(created)
    }

    async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        let sql = format!("SELECT {} FROM events ORDER BY id", EVENT_COLUMNS);
        let events = sqlx::query_as::<_, Event>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn find_by_ids(&self, ids: &[EventId]) -> AppResult<Vec<Event>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM events WHERE id = ANY($1) ORDER BY id",
            EVENT_COLUMNS
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn find_by_category(&self, category_id: CategoryId) -> AppResult<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events WHERE category_id = $1 ORDER BY id",
            EVENT_COLUMNS
        );
        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }
}

pub struct PostgresHostRepository {
    pool: PgPool,
}

impl PostgresHostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HostRepository for PostgresHostRepository {
    async fn attribute(&self, event_id: EventId, user_id: UserId) -> AppResult<UserId> {
        // The no-op update makes RETURNING yield the existing host on conflict
        let host: UserId = sqlx::query_scalar(
            "INSERT INTO event_hosts (event_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (event_id) DO UPDATE SET user_id = event_hosts.user_id \
             RETURNING user_id",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| missing_reference(e, HOST_REFERENCES))?;
        Ok(host)
    }

    async fn events_hosted_by(&self, user_id: UserId) -> AppResult<Vec<EventId>> {
        let ids = sqlx::query_scalar::<_, EventId>(
            "SELECT event_id FROM event_hosts WHERE user_id = $1 ORDER BY event_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn hosts_of(&self, event_id: EventId) -> AppResult<Vec<UserId>> {
        let hosts =
            sqlx::query_scalar::<_, UserId>("SELECT user_id FROM event_hosts WHERE event_id = $1")
                .bind(event_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(hosts)
    }

    async fn hosts_for(&self, event_ids: &[EventId]) -> AppResult<Vec<EventHost>> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let hosts = sqlx::query_as::<_, EventHost>(
            "SELECT event_id, user_id FROM event_hosts WHERE event_id = ANY($1)",
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(hosts)
    }

    async fn orphaned_events(&self) -> AppResult<Vec<EventId>> {
        let ids = sqlx::query_scalar::<_, EventId>(
            "SELECT e.id FROM events e \
             LEFT JOIN event_hosts h ON h.event_id = e.id \
             WHERE h.event_id IS NULL ORDER BY e.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

pub struct PostgresLikeRepository {
    pool: PgPool,
}

impl PostgresLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn toggle(&self, user_id: UserId, event_id: EventId) -> AppResult<LikeState> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent toggles on the same pair until commit
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(user_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        let removed = sqlx::query("DELETE FROM event_likes WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let state = if removed > 0 {
            LikeState::NotLiked
        } else {
            sqlx::query(
                "INSERT INTO event_likes (user_id, event_id) VALUES ($1, $2) \
                 ON CONFLICT (user_id, event_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| missing_reference(e, LIKE_REFERENCES))?;
            LikeState::Liked
        };

        tx.commit().await?;
        Ok(state)
    }

    async fn set(&self, user_id: UserId, event_id: EventId, state: LikeState) -> AppResult<()> {
        let sql = match state {
            LikeState::Liked => {
                "INSERT INTO event_likes (user_id, event_id) VALUES ($1, $2) \
                 ON CONFLICT (user_id, event_id) DO NOTHING"
            }
            LikeState::NotLiked => "DELETE FROM event_likes WHERE user_id = $1 AND event_id = $2",
        };
        sqlx::query(sql)
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| missing_reference(e, LIKE_REFERENCES))?;
        Ok(())
    }

    async fn count_for_event(&self, event_id: EventId) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_likes WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
