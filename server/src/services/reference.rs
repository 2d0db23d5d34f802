use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::models::{CategoryId, Event, LocationId};
use crate::repositories::ReferenceRepository;
use crate::utils::{AppError, AppResult, Resource};

/// Translates location/category display names to ids and back.
#[derive(Clone)]
pub struct ReferenceResolver {
    repo: Arc<dyn ReferenceRepository>,
}

impl ReferenceResolver {
    pub fn new(repo: Arc<dyn ReferenceRepository>) -> Self {
        Self { repo }
    }

    /// A missing name resolves like an unknown one.
    pub async fn resolve_location(&self, name: Option<&str>) -> AppResult<LocationId> {
        let Some(name) = name else {
            return Err(AppError::NotFound(Resource::Location));
        };
        self.repo
            .location_by_name(name)
            .await?
            .map(|l| l.id)
            .ok_or(AppError::NotFound(Resource::Location))
    }

    pub async fn resolve_category(&self, name: Option<&str>) -> AppResult<CategoryId> {
        let Some(name) = name else {
            return Err(AppError::NotFound(Resource::Category));
        };
        self.repo
            .category_by_name(name)
            .await?
            .map(|c| c.id)
            .ok_or(AppError::NotFound(Resource::Category))
    }

    pub async fn describe_location(&self, id: LocationId) -> AppResult<String> {
        self.repo
            .locations_by_ids(&[id])
            .await?
            .into_iter()
            .next()
            .map(|l| l.description)
            .ok_or_else(|| dangling("location", id))
    }

    pub async fn describe_category(&self, id: CategoryId) -> AppResult<String> {
        self.repo
            .categories_by_ids(&[id])
            .await?
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| dangling("category", id))
    }

    /// Fetch the names of every location and category referenced by `events`
    /// in two batched queries.
    pub async fn describe_all(&self, events: &[Event]) -> AppResult<Descriptions> {
        let location_ids: Vec<LocationId> = events
            .iter()
            .map(|e| e.location_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let category_ids: Vec<CategoryId> = events
            .iter()
            .map(|e| e.category_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (locations, categories) = tokio::try_join!(
            self.repo.locations_by_ids(&location_ids),
            self.repo.categories_by_ids(&category_ids)
        )?;

        Ok(Descriptions {
            locations: locations.into_iter().map(|l| (l.id, l.description)).collect(),
            categories: categories
                .into_iter()
                .map(|c| (c.id, c.description))
                .collect(),
        })
    }
}

/// Location and category names keyed by id.
#[derive(Debug, Default)]
pub struct Descriptions {
    locations: HashMap<LocationId, String>,
    categories: HashMap<CategoryId, String>,
}

impl Descriptions {
    pub fn location(&self, id: LocationId) -> AppResult<&str> {
        self.locations
            .get(&id)
            .map(String::as_str)
            .ok_or_else(|| dangling("location", id))
    }

    pub fn category(&self, id: CategoryId) -> AppResult<&str> {
        self.categories
            .get(&id)
            .map(String::as_str)
            .ok_or_else(|| dangling("category", id))
    }
}

fn dangling(kind: &str, id: i32) -> AppError {
    AppError::InternalConsistency(format!("{} {} is referenced but does not exist", kind, id))
}
