//! In-process store implementing every repository trait.
//!
//! Mirrors the Postgres schema constraints (foreign keys, one host per
//! event, unique like pairs) so services behave the same against both.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EventRepository, HostRepository, LikeRepository, ReferenceRepository, UserRepository};
use crate::models::{
    Category, CategoryId, Event, EventHost, EventId, LikeState, Location, LocationId, NewEvent,
    User, UserId,
};
use crate::utils::{AppError, AppResult, Resource};

#[derive(Default)]
struct State {
    locations: BTreeMap<LocationId, Location>,
    categories: BTreeMap<CategoryId, Category>,
    users: BTreeMap<UserId, User>,
    events: BTreeMap<EventId, Event>,
    hosts: BTreeMap<EventId, UserId>,
    likes: BTreeSet<(UserId, EventId)>,
    last_event_id: EventId,
}

impl State {
    fn check_event_refs(&self, event: &NewEvent) -> AppResult<()> {
        if !self.locations.contains_key(&event.location_id) {
            return Err(AppError::NotFound(Resource::Location));
        }
        if !self.categories.contains_key(&event.category_id) {
            return Err(AppError::NotFound(Resource::Category));
        }
        Ok(())
    }

    /// A new like row needs both ends of the pair to exist.
    fn check_like_refs(&self, user_id: UserId, event_id: EventId) -> AppResult<()> {
        if !self.events.contains_key(&event_id) {
            return Err(AppError::NotFound(Resource::Event));
        }
        if !self.users.contains_key(&user_id) {
            return Err(AppError::NotFound(Resource::User));
        }
        Ok(())
    }

    fn insert_event(&mut self, event: &NewEvent) -> Event {
        self.last_event_id += 1;
        let created = event.clone().into_event(self.last_event_id);
        self.events.insert(created.id, created.clone());
        created
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_location(&self, id: LocationId, description: &str) -> Location {
        let location = Location {
            id,
            description: description.to_string(),
        };
        let mut state = self.state.write().await;
        state.locations.insert(id, location.clone());
        location
    }

    pub async fn insert_category(&self, id: CategoryId, description: &str) -> Category {
        let category = Category {
            id,
            description: description.to_string(),
        };
        let mut state = self.state.write().await;
        state.categories.insert(id, category.clone());
        category
    }

    pub async fn insert_user(&self, user: User) -> User {
        let mut state = self.state.write().await;
        state.users.insert(user.id, user.clone());
        user
    }

    pub async fn has_like(&self, user_id: UserId, event_id: EventId) -> bool {
        self.state.read().await.likes.contains(&(user_id, event_id))
    }

    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }
}

#[async_trait]
impl ReferenceRepository for MemoryStore {
    async fn location_by_name(&self, name: &str) -> AppResult<Option<Location>> {
        let state = self.state.read().await;
        Ok(state
            .locations
            .values()
            .find(|l| l.description == name)
            .cloned())
    }

    async fn category_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .find(|c| c.description == name)
            .cloned())
    }

    async fn locations_by_ids(&self, ids: &[LocationId]) -> AppResult<Vec<Location>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.locations.get(id).cloned())
            .collect())
    }

    async fn categories_by_ids(&self, ids: &[CategoryId]) -> AppResult<Vec<Category>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.categories.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn insert(&self, event: &NewEvent) -> AppResult<Event> {
        let mut state = self.state.write().await;
        state.check_event_refs(event)?;
        Ok(state.insert_event(event))
    }

    async fn insert_hosted(&self, event: &NewEvent, host: UserId) -> AppResult<Event> {
        let mut state = self.state.write().await;
        state.check_event_refs(event)?;
        if !state.users.contains_key(&host) {
            return Err(AppError::NotFound(Resource::User));
        }
        let created = state.insert_event(event);
        state.hosts.insert(created.id, host);
        Ok(created)
    }

    async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        Ok(self.state.read().await.events.values().cloned().collect())
    }

    async fn find_by_ids(&self, ids: &[EventId]) -> AppResult<Vec<Event>> {
        let wanted: BTreeSet<EventId> = ids.iter().copied().collect();
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .filter(|e| wanted.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn find_by_category(&self, category_id: CategoryId) -> AppResult<Vec<Event>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .filter(|e| e.category_id == category_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HostRepository for MemoryStore {
    async fn attribute(&self, event_id: EventId, user_id: UserId) -> AppResult<UserId> {
        let mut state = self.state.write().await;
        if !state.events.contains_key(&event_id) {
            return Err(AppError::NotFound(Resource::Event));
        }
        if !state.users.contains_key(&user_id) {
            return Err(AppError::NotFound(Resource::User));
        }
        Ok(*state.hosts.entry(event_id).or_insert(user_id))
    }

    async fn events_hosted_by(&self, user_id: UserId) -> AppResult<Vec<EventId>> {
        let state = self.state.read().await;
        Ok(state
            .hosts
            .iter()
            .filter(|(_, host)| **host == user_id)
            .map(|(event_id, _)| *event_id)
            .collect())
    }

    async fn hosts_of(&self, event_id: EventId) -> AppResult<Vec<UserId>> {
        let state = self.state.read().await;
        Ok(state.hosts.get(&event_id).copied().into_iter().collect())
    }

    async fn hosts_for(&self, event_ids: &[EventId]) -> AppResult<Vec<EventHost>> {
        let state = self.state.read().await;
        Ok(event_ids
            .iter()
            .filter_map(|event_id| {
                state.hosts.get(event_id).map(|user_id| EventHost {
                    event_id: *event_id,
                    user_id: *user_id,
                })
            })
            .collect())
    }

    async fn orphaned_events(&self) -> AppResult<Vec<EventId>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .keys()
            .filter(|id| !state.hosts.contains_key(id))
            .copied()
            .collect())
    }
}

#[async_trait]
impl LikeRepository for MemoryStore {
    async fn toggle(&self, user_id: UserId, event_id: EventId) -> AppResult<LikeState> {
        let mut state = self.state.write().await;
        if !state.events.contains_key(&event_id) {
            return Err(AppError::NotFound(Resource::Event));
        }
        let pair = (user_id, event_id);
        if state.likes.remove(&pair) {
            return Ok(LikeState::NotLiked);
        }
        state.check_like_refs(user_id, event_id)?;
        state.likes.insert(pair);
        Ok(LikeState::Liked)
    }

    async fn set(&self, user_id: UserId, event_id: EventId, like: LikeState) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.events.contains_key(&event_id) {
            return Err(AppError::NotFound(Resource::Event));
        }
        match like {
            LikeState::Liked => {
                state.check_like_refs(user_id, event_id)?;
                state.likes.insert((user_id, event_id));
            }
            LikeState::NotLiked => {
                state.likes.remove(&(user_id, event_id));
            }
        }
        Ok(())
    }

    async fn count_for_event(&self, event_id: EventId) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state.likes.iter().filter(|(_, e)| *e == event_id).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn new_event(location_id: LocationId, category_id: CategoryId) -> NewEvent {
        NewEvent {
            title: "Concert".into(),
            description: "desc".into(),
            location_id,
            address: "Main St".into(),
            start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            image: "a.png".into(),
            category_id,
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_location(1, "Lisbon").await;
        store.insert_category(2, "Music").await;
        store
            .insert_user(User {
                id: 7,
                name: "Alice".into(),
                surname: "Silva".into(),
                username: "alice".into(),
                profile_picture: "default.png".into(),
            })
            .await;
        store
    }

    #[tokio::test]
    async fn test_insert_rejects_dangling_category() {
        let store = seeded().await;
        let err = store.insert(&new_event(1, 99)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::Category)));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_insert_hosted_writes_nothing_for_unknown_host() {
        let store = seeded().await;
        let err = store.insert_hosted(&new_event(1, 2), 404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::User)));
        assert_eq!(store.event_count().await, 0);
        assert!(store.orphaned_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attribute_keeps_first_host() {
        let store = seeded().await;
        store
            .insert_user(User {
                id: 8,
                name: "Bob".into(),
                surname: "Costa".into(),
                username: "bob".into(),
                profile_picture: "default.png".into(),
            })
            .await;
        let event = store.insert(&new_event(1, 2)).await.unwrap();

        assert_eq!(store.attribute(event.id, 7).await.unwrap(), 7);
        assert_eq!(store.attribute(event.id, 8).await.unwrap(), 7);
        assert_eq!(store.hosts_of(event.id).await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_like_for_unknown_user_is_rejected() {
        let store = seeded().await;
        let event = store.insert(&new_event(1, 2)).await.unwrap();

        let err = store.toggle(999, event.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::User)));
        let err = store.set(999, event.id, LikeState::Liked).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::User)));
        assert!(!store.has_like(999, event.id).await);

        // Removing a like that cannot exist is a no-op, as a DELETE would be
        store.set(999, event.id, LikeState::NotLiked).await.unwrap();
        assert_eq!(store.toggle(7, event.id).await.unwrap(), LikeState::Liked);
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_unknown_ids() {
        let store = seeded().await;
        let first = store.insert(&new_event(1, 2)).await.unwrap();
        let second = store.insert(&new_event(1, 2)).await.unwrap();

        let found = EventRepository::find_by_ids(&store, &[second.id, 500, first.id])
            .await
            .unwrap();
        let ids: Vec<EventId> = found.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
