use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer, Config};
use crate::handlers::events::{
    create_event, list_all_events, list_events_any_category, list_events_by_category,
    list_events_by_host,
};
use crate::handlers::health_check;
use crate::handlers::likes::{like_event, toggle_like, unlike_event};
use crate::state::AppState;

/// Room for the text fields and multipart framing around the image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let body_limit = config.upload_max_bytes as usize + FORM_OVERHEAD_BYTES;

    let api = Router::new()
        .route("/health", get(health_check))
        .route(
            "/users/:id/events",
            post(create_event).get(list_events_by_host),
        )
        .route("/users/:id/likes", post(toggle_like))
        .route(
            "/users/:id/likes/:event_id",
            put(like_event).delete(unlike_event),
        )
        .route("/events", get(list_all_events))
        .route("/events/category", get(list_events_any_category))
        .route("/events/category/:id", get(list_events_by_category))
        .nest_service("/uploads/events", ServeDir::new(&config.upload_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    apply_security_headers(api, config.production)
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
