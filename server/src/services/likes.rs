use std::sync::Arc;

use tracing::info;

use crate::models::{Event, EventId, LikeOutcome, LikeState, UserId};
use crate::repositories::{EventRepository, LikeRepository};
use crate::utils::{AppError, AppResult, Resource};

/// Per-(user, event) likes.
#[derive(Clone)]
pub struct LikeRegistry {
    likes: Arc<dyn LikeRepository>,
    events: Arc<dyn EventRepository>,
}

impl LikeRegistry {
    pub fn new(likes: Arc<dyn LikeRepository>, events: Arc<dyn EventRepository>) -> Self {
        Self { likes, events }
    }

    /// Flip the like for the pair. Not idempotent: replaying the call undoes it.
    pub async fn toggle(&self, user_id: UserId, event_id: EventId) -> AppResult<LikeOutcome> {
        self.require_event(event_id).await?;
        let state = self.likes.toggle(user_id, event_id).await?;
        info!(user_id, event_id, ?state, "Like toggled");
        self.outcome(event_id, state).await
    }

    /// Idempotent like or unlike.
    pub async fn set(
        &self,
        user_id: UserId,
        event_id: EventId,
        state: LikeState,
    ) -> AppResult<LikeOutcome> {
        self.require_event(event_id).await?;
        self.likes.set(user_id, event_id, state).await?;
        info!(user_id, event_id, ?state, "Like set");
        self.outcome(event_id, state).await
    }

    async fn require_event(&self, event_id: EventId) -> AppResult<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Event))
    }

    async fn outcome(&self, event_id: EventId, state: LikeState) -> AppResult<LikeOutcome> {
        let (event, likes) = tokio::try_join!(
            self.require_event(event_id),
            self.likes.count_for_event(event_id)
        )?;
        Ok(LikeOutcome {
            state,
            likes,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewEvent, User};
    use crate::repositories::MemoryStore;
    use chrono::Utc;

    async fn setup() -> (Arc<MemoryStore>, LikeRegistry, EventId) {
        let memory = Arc::new(MemoryStore::new());
        memory.insert_location(1, "Lisbon").await;
        memory.insert_category(2, "Music").await;
        memory
            .insert_user(User {
                id: 7,
                name: "Alice".into(),
                surname: "Silva".into(),
                username: "alice".into(),
                profile_picture: "default.png".into(),
            })
            .await;
        let event = memory
            .insert(&NewEvent {
                title: "Concert".into(),
                description: "desc".into(),
                location_id: 1,
                address: "Main St".into(),
                start_date: Utc::now(),
                end_date: Utc::now(),
                image: "a.png".into(),
                category_id: 2,
            })
            .await
            .unwrap();
        let registry = LikeRegistry::new(memory.clone(), memory.clone());
        (memory, registry, event.id)
    }

    #[tokio::test]
    async fn test_toggle_twice_returns_to_not_liked() {
        let (memory, registry, event_id) = setup().await;

        let first = registry.toggle(7, event_id).await.unwrap();
        assert_eq!(first.state, LikeState::Liked);
        assert_eq!(first.likes, 1);
        assert_eq!(first.event.id, event_id);
        assert!(memory.has_like(7, event_id).await);

        let second = registry.toggle(7, event_id).await.unwrap();
        assert_eq!(second.state, LikeState::NotLiked);
        assert_eq!(second.likes, 0);
        assert!(!memory.has_like(7, event_id).await);
    }

    #[tokio::test]
    async fn test_toggle_by_unknown_user() {
        let (memory, registry, event_id) = setup().await;
        assert!(matches!(
            registry.toggle(404, event_id).await,
            Err(AppError::NotFound(Resource::User))
        ));
        assert!(!memory.has_like(404, event_id).await);
    }

    #[tokio::test]
    async fn test_toggle_unknown_event() {
        let (_, registry, _) = setup().await;
        assert!(matches!(
            registry.toggle(7, 999).await,
            Err(AppError::NotFound(Resource::Event))
        ));
    }

    #[tokio::test]
    async fn test_set_is_idempotent() {
        let (memory, registry, event_id) = setup().await;
        registry.set(7, event_id, LikeState::Liked).await.unwrap();
        let again = registry.set(7, event_id, LikeState::Liked).await.unwrap();
        assert_eq!(again.state, LikeState::Liked);
        assert_eq!(again.likes, 1);

        registry.set(7, event_id, LikeState::NotLiked).await.unwrap();
        let again = registry.set(7, event_id, LikeState::NotLiked).await.unwrap();
        assert_eq!(again.likes, 0);
        assert!(!memory.has_like(7, event_id).await);
    }

    #[tokio::test]
    async fn test_concurrent_toggles_keep_pair_unique() {
        let (memory, registry, event_id) = setup().await;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.toggle(7, event_id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        // an even number of flips lands back on NotLiked
        assert!(!memory.has_like(7, event_id).await);
        assert_eq!(registry.set(7, event_id, LikeState::Liked).await.unwrap().likes, 1);
    }
}
