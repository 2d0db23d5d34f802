use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{CategoryId, EventId, HostProfile, LocationId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location_id: LocationId,
    pub address: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub image: String,
    pub category_id: CategoryId,
}

/// Unvalidated creation input, with location and category already resolved.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub location_id: LocationId,
    pub category_id: CategoryId,
    pub host_id: UserId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub image: Option<String>,
}

/// A draft that passed validation; text fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub location_id: LocationId,
    pub address: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub image: String,
    pub category_id: CategoryId,
}

impl NewEvent {
    pub fn into_event(self, id: EventId) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            location_id: self.location_id,
            address: self.address,
            start_date: self.start_date,
            end_date: self.end_date,
            image: self.image,
            category_id: self.category_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub location_name: String,
    pub category_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEventWithHost {
    #[serde(flatten)]
    pub event: EnrichedEvent,
    pub user: HostProfile,
}
