use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::models::{CategoryId, UserId};
use crate::services::CreateEventRequest;
use crate::state::AppState;
use crate::uploads::{ImageUpload, UploadPolicy};
use crate::utils::response::{created, success};
use crate::utils::{AppError, AppResult};

const IMAGE_FIELD: &str = "image";

/// A body cut off by the request limit is an oversized upload. Other
/// transport failures are logged and reported without their detail.
fn multipart_error(err: MultipartError, policy: &UploadPolicy) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::UploadTooLarge {
            limit: policy.max_bytes(),
        };
    }
    tracing::debug!(error = %err.body_text(), "Unreadable multipart body");
    AppError::UploadRejected("Malformed multipart body".to_string())
}

/// Read the image part, failing as soon as it outgrows the policy limit.
async fn read_image(mut field: Field<'_>, policy: &UploadPolicy) -> AppResult<ImageUpload> {
    let file_name = field.file_name().map(str::to_owned);
    let content_type = field.content_type().map(str::to_owned);
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, policy))? {
        policy.check_size((data.len() + chunk.len()) as u64)?;
        data.extend_from_slice(&chunk);
    }
    Ok(ImageUpload {
        file_name,
        content_type,
        data,
    })
}

pub async fn create_event(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let policy = state.events.images().policy();
    let mut request = CreateEventRequest::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, policy))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == IMAGE_FIELD {
            image = Some(read_image(field, policy).await?);
            continue;
        }

        let value = field.text().await.map_err(|e| multipart_error(e, policy))?;
        match name.as_str() {
            "title" => request.title = Some(value),
            "description" => request.description = Some(value),
            "locationName" => request.location_name = Some(value),
            // older clients spell it "adress"
            "address" | "adress" => request.address = Some(value),
            "startDate" => request.start_date = Some(value),
            "endDate" => request.end_date = Some(value),
            "categoryName" => request.category_name = Some(value),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let event = state.events.create_event(user_id, request, image).await?;
    Ok(created(event, "Event created"))
}

pub async fn list_events_by_host(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Response> {
    let events = state.events.list_events_by_host(user_id).await?;
    Ok(success(events, "Events found"))
}

async fn events_in_category(state: &AppState, category_id: Option<CategoryId>) -> AppResult<Response> {
    let events = state.events.list_events_by_category(category_id).await?;
    Ok(success(events, "Events found"))
}

pub async fn list_events_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> AppResult<Response> {
    events_in_category(&state, Some(category_id)).await
}

/// The category listing with no category given falls back to every event.
pub async fn list_events_any_category(State(state): State<AppState>) -> AppResult<Response> {
    events_in_category(&state, None).await
}

pub async fn list_all_events(State(state): State<AppState>) -> AppResult<Response> {
    let events = state.events.list_all_events().await?;
    Ok(success(events, "Events found"))
}
