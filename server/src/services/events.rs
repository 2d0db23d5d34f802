use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::info;

use crate::models::{CategoryId, Event, EventDraft, EventId, NewEvent, UserId};
use crate::repositories::{EventRepository, UserRepository};
use crate::utils::{AppError, AppResult, Resource, ValidationError};

/// Creation and lookup of events.
#[derive(Clone)]
pub struct EventStore {
    events: Arc<dyn EventRepository>,
    users: Arc<dyn UserRepository>,
}

impl EventStore {
    pub fn new(events: Arc<dyn EventRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { events, users }
    }

    /// Check the host exists, then the draft's own fields.
    ///
    /// The first failing rule is reported: unknown host, missing field,
    /// whitespace-only field, unparseable date, start after end.
    pub async fn validate(&self, draft: EventDraft) -> AppResult<NewEvent> {
        if self.users.find_by_id(draft.host_id).await?.is_none() {
            return Err(AppError::NotFound(Resource::User));
        }
        Ok(validate_fields(draft)?)
    }

    /// Validate and insert an event. No host row is written.
    pub async fn create_event(&self, draft: EventDraft) -> AppResult<Event> {
        let new_event = self.validate(draft).await?;
        let event = self.events.insert(&new_event).await?;
        info!(event_id = event.id, "Event created");
        Ok(event)
    }

    /// Insert a validated event together with its host attribution.
    pub async fn insert_hosted(&self, event: &NewEvent, host: UserId) -> AppResult<Event> {
        let event = self.events.insert_hosted(event, host).await?;
        info!(event_id = event.id, user_id = host, "Event created");
        Ok(event)
    }

    pub async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>> {
        self.events.find_by_id(id).await
    }

    pub async fn find_all(&self) -> AppResult<Vec<Event>> {
        self.events.find_all().await
    }

    pub async fn find_by_ids(&self, ids: &[EventId]) -> AppResult<Vec<Event>> {
        self.events.find_by_ids(ids).await
    }

    /// Without a category this is `find_all`.
    pub async fn find_by_category(&self, category_id: Option<CategoryId>) -> AppResult<Vec<Event>> {
        match category_id {
            Some(id) => self.events.find_by_category(id).await,
            None => self.events.find_all().await,
        }
    }
}

fn validate_fields(draft: EventDraft) -> Result<NewEvent, ValidationError> {
    let title = required("title", draft.title)?;
    let description = required("description", draft.description)?;
    let address = required("address", draft.address)?;
    let start_date = required("startDate", draft.start_date)?;
    let end_date = required("endDate", draft.end_date)?;
    let image = required("image", draft.image)?;

    let title = not_blank("title", &title)?;
    let description = not_blank("description", &description)?;
    let address = not_blank("address", &address)?;

    let start_date = parse_date("startDate", &start_date)?;
    let end_date = parse_date("endDate", &end_date)?;
    if start_date > end_date {
        return Err(ValidationError::InvalidDateRange);
    }

    Ok(NewEvent {
        title,
        description,
        location_id: draft.location_id,
        address,
        start_date,
        end_date,
        image,
        category_id: draft.category_id,
    })
}

/// Absent and empty values both count as missing.
fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn not_blank(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) or `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(ValidationError::InvalidDate(field))
}
