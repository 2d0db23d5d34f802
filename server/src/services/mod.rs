//! Event lifecycle and social enrichment.
//!
//! [`EventService`] runs the request flows; the components it wires together
//! each own one table or one concern.

use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{
    CategoryId, EnrichedEvent, EnrichedEventWithHost, Event, EventDraft, EventId, LikeOutcome,
    LikeState, UserId,
};
use crate::repositories::{Repositories, UserRepository};
use crate::uploads::{ImageStore, ImageUpload};
use crate::utils::{AppError, AppResult, Resource};

pub mod aggregator;
pub mod events;
pub mod hosts;
pub mod likes;
pub mod reference;

pub use aggregator::EventAggregator;
pub use events::EventStore;
pub use hosts::HostRegistry;
pub use likes::LikeRegistry;
pub use reference::ReferenceResolver;

/// Text fields of a create request, as received.
#[derive(Debug, Clone, Default)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location_name: Option<String>,
    pub address: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Clone)]
pub struct EventService {
    references: ReferenceResolver,
    events: EventStore,
    hosts: HostRegistry,
    likes: LikeRegistry,
    aggregator: EventAggregator,
    users: Arc<dyn UserRepository>,
    images: Arc<dyn ImageStore>,
}

impl EventService {
    pub fn new(repos: Repositories, images: Arc<dyn ImageStore>) -> Self {
        let references = ReferenceResolver::new(repos.references);
        let hosts = HostRegistry::new(repos.hosts);
        Self {
            events: EventStore::new(repos.events.clone(), repos.users.clone()),
            likes: LikeRegistry::new(repos.likes, repos.events),
            aggregator: EventAggregator::new(references.clone(), hosts.clone(), repos.users.clone()),
            references,
            hosts,
            users: repos.users,
            images,
        }
    }

    pub fn images(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }

    pub fn hosts(&self) -> &HostRegistry {
        &self.hosts
    }

    /// Create an event hosted by `user_id`.
    ///
    /// Upload checks run first, then location, category, host and field
    /// validation. The image is written only once everything validated and is
    /// removed again if the insert fails. Event and host rows are written in
    /// one transaction.
    pub async fn create_event(
        &self,
        user_id: UserId,
        request: CreateEventRequest,
        image: Option<ImageUpload>,
    ) -> AppResult<Event> {
        let pending = image.map(|upload| self.images.accept(upload)).transpose()?;

        let location_id = self
            .references
            .resolve_location(request.location_name.as_deref())
            .await?;
        let category_id = self
            .references
            .resolve_category(request.category_name.as_deref())
            .await?;

        let mut new_event = self
            .events
            .validate(EventDraft {
                location_id,
                category_id,
                host_id: user_id,
                title: request.title,
                description: request.description,
                address: request.address,
                start_date: request.start_date,
                end_date: request.end_date,
                image: pending.as_ref().map(|p| p.filename.clone()),
            })
            .await?;

        if let Some(pending) = pending {
            new_event.image = self.images.store(pending).await?;
        }

        match self.events.insert_hosted(&new_event, user_id).await {
            Ok(event) => Ok(event),
            Err(err) => {
                if let Err(cleanup) = self.images.discard(&new_event.image).await {
                    warn!(image = %new_event.image, error = %cleanup, "Failed to discard image");
                }
                Err(err)
            }
        }
    }

    pub async fn list_events_by_host(&self, user_id: UserId) -> AppResult<Vec<EnrichedEvent>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(Resource::User));
        }
        let event_ids = self.hosts.find_events_hosted_by(user_id).await?;
        let events = self.events.find_by_ids(&event_ids).await?;
        self.aggregator.enrich(events).await
    }

    pub async fn list_events_by_category(
        &self,
        category_id: Option<CategoryId>,
    ) -> AppResult<Vec<EnrichedEvent>> {
        let events = self.events.find_by_category(category_id).await?;
        self.aggregator.enrich(events).await
    }

    pub async fn list_all_events(&self) -> AppResult<Vec<EnrichedEventWithHost>> {
        let events = self.events.find_all().await?;
        self.aggregator.enrich_with_hosts(events).await
    }

    pub async fn toggle_like(&self, user_id: UserId, event_id: EventId) -> AppResult<LikeOutcome> {
        self.likes.toggle(user_id, event_id).await
    }

    pub async fn set_like(
        &self,
        user_id: UserId,
        event_id: EventId,
        state: LikeState,
    ) -> AppResult<LikeOutcome> {
        self.likes.set(user_id, event_id, state).await
    }

    /// Log events left without a host so an operator can attribute them.
    pub async fn report_orphans(&self) -> AppResult<usize> {
        let orphans = self.hosts.orphaned_events().await?;
        if orphans.is_empty() {
            info!("All events have a host");
        }
        Ok(orphans.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::repositories::MemoryStore;
    use crate::uploads::{LocalImageStore, PendingImage, UploadPolicy, DEFAULT_MAX_BYTES};
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    /// Keeps images in memory under a name of its own choosing.
    struct PrefixingImageStore {
        policy: UploadPolicy,
        stored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageStore for PrefixingImageStore {
        fn policy(&self) -> &UploadPolicy {
            &self.policy
        }

        async fn store(&self, image: PendingImage) -> AppResult<String> {
            let name = format!("cdn-{}", image.filename);
            self.stored.lock().await.push(name.clone());
            Ok(name)
        }

        async fn discard(&self, filename: &str) -> AppResult<()> {
            self.stored.lock().await.retain(|n| n != filename);
            Ok(())
        }
    }

    struct Fixture {
        memory: Arc<MemoryStore>,
        service: EventService,
        dir: TempDir,
    }

    impl Fixture {
        fn stored_files(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }
    }

    async fn fixture() -> Fixture {
        let memory = Arc::new(MemoryStore::new());
        memory.insert_location(1, "Lisbon").await;
        memory.insert_category(2, "Music").await;
        memory.insert_category(3, "Sports").await;
        memory
            .insert_user(User {
                id: 7,
                name: "Alice".into(),
                surname: "Silva".into(),
                username: "alice".into(),
                profile_picture: "alice.png".into(),
            })
            .await;
        let dir = tempfile::tempdir().unwrap();
        let images = LocalImageStore::new(UploadPolicy::images(DEFAULT_MAX_BYTES, dir.path()));
        let service = EventService::new(Repositories::memory(memory.clone()), Arc::new(images));
        Fixture {
            memory,
            service,
            dir,
        }
    }

    fn request(location: &str, category: &str) -> CreateEventRequest {
        CreateEventRequest {
            title: Some("Concert".into()),
            description: Some("desc".into()),
            location_name: Some(location.into()),
            address: Some("Main St".into()),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-02".into()),
            category_name: Some(category.into()),
        }
    }

    fn image() -> ImageUpload {
        ImageUpload {
            file_name: Some("poster.jpg".into()),
            content_type: Some("image/jpeg".into()),
            data: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[tokio::test]
    async fn test_create_like_and_unlike_scenario() {
        let fx = fixture().await;
        let event = fx
            .service
            .create_event(7, request("Lisbon", "Music"), Some(image()))
            .await
            .unwrap();
        assert_eq!(event.location_id, 1);
        assert_eq!(event.category_id, 2);
        assert!(event.image.ends_with(".jpg"));
        assert_eq!(fx.stored_files(), 1);
        assert_eq!(fx.service.hosts().find_host(event.id).await.unwrap(), 7);

        let liked = fx.service.toggle_like(7, event.id).await.unwrap();
        assert_eq!(liked.state, LikeState::Liked);
        let unliked = fx.service.toggle_like(7, event.id).await.unwrap();
        assert_eq!(unliked.state, LikeState::NotLiked);
        assert!(!fx.memory.has_like(7, event.id).await);
    }

    #[tokio::test]
    async fn test_unknown_location_creates_nothing() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_event(7, request("Atlantis", "Music"), Some(image()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::Location)));
        assert_eq!(fx.memory.event_count().await, 0);
        assert_eq!(fx.stored_files(), 0);
    }

    #[tokio::test]
    async fn test_validation_order_location_category_user() {
        let fx = fixture().await;
        let mut bad = request("Atlantis", "Nope");
        bad.title = None;
        let err = fx.service.create_event(99, bad, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::Location)));

        let mut bad = request("Lisbon", "Nope");
        bad.title = None;
        let err = fx.service.create_event(99, bad, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::Category)));

        let mut bad = request("Lisbon", "Music");
        bad.title = None;
        let err = fx.service.create_event(99, bad, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(Resource::User)));
    }

    #[tokio::test]
    async fn test_rejected_upload_precedes_everything() {
        let fx = fixture().await;
        let mut upload = image();
        upload.file_name = Some("script.sh".into());
        let err = fx
            .service
            .create_event(7, request("Atlantis", "Music"), Some(upload))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UploadRejected(_)));
    }

    #[tokio::test]
    async fn test_missing_image_is_a_missing_field() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_event(7, request("Lisbon", "Music"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(crate::utils::ValidationError::MissingField("image"))
        ));
    }

    #[tokio::test]
    async fn test_event_records_name_chosen_by_image_store() {
        let fx = fixture().await;
        let images = Arc::new(PrefixingImageStore {
            policy: UploadPolicy::images(DEFAULT_MAX_BYTES, fx.dir.path()),
            stored: Mutex::new(Vec::new()),
        });
        let service = EventService::new(Repositories::memory(fx.memory.clone()), images.clone());

        let event = service
            .create_event(7, request("Lisbon", "Music"), Some(image()))
            .await
            .unwrap();
        assert!(event.image.starts_with("cdn-"));
        assert_eq!(*images.stored.lock().await, vec![event.image.clone()]);
    }

    #[tokio::test]
    async fn test_listings() {
        let fx = fixture().await;
        fx.service
            .create_event(7, request("Lisbon", "Music"), Some(image()))
            .await
            .unwrap();
        fx.service
            .create_event(7, request("Lisbon", "Sports"), Some(image()))
            .await
            .unwrap();

        let all = fx.service.list_all_events().await.unwrap();
        assert_eq!(all.len(), fx.memory.event_count().await);
        assert!(all.iter().all(|e| e.user.username == "alice"));

        let uncategorised = fx.service.list_events_by_category(None).await.unwrap();
        let all_plain: Vec<EnrichedEvent> = all.into_iter().map(|e| e.event).collect();
        assert_eq!(uncategorised, all_plain);

        let sports = fx.service.list_events_by_category(Some(3)).await.unwrap();
        assert_eq!(sports.len(), 1);
        assert_eq!(sports[0].category_name, "Sports");

        assert_eq!(fx.service.list_events_by_host(7).await.unwrap().len(), 2);
        assert!(matches!(
            fx.service.list_events_by_host(8).await,
            Err(AppError::NotFound(Resource::User))
        ));
        assert_eq!(fx.service.report_orphans().await.unwrap(), 0);
    }
}
