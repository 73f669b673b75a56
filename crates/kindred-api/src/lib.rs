pub mod auth;
pub mod error;
pub mod extract;
pub mod mapping;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod photos;
pub mod state;
pub mod token;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::middleware::{require_auth, track_activity};
use crate::state::AppState;

/// Every `/api` route. Static files and CORS are the binary's concern.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    // Layers run bottom-up: auth first, then activity tracking around the handler.
    let protected_routes = Router::new()
        .route("/api/users", get(users::get_users))
        .route("/api/users/{user_id}", get(users::get_user).put(users::update_user))
        .route("/api/users/{user_id}/like/{recipient_id}", post(users::like_user))
        .route("/api/users/{user_id}/photos", post(photos::add_photo))
        .route(
            "/api/users/{user_id}/photos/{id}",
            get(photos::get_photo).delete(photos::delete_photo),
        )
        .route("/api/users/{user_id}/photos/{id}/setMain", post(photos::set_main_photo))
        .route(
            "/api/users/{user_id}/messages",
            get(messages::get_messages_for_user).post(messages::create_message),
        )
        .route(
            "/api/users/{user_id}/messages/thread/{recipient_id}",
            get(messages::get_message_thread),
        )
        .route(
            "/api/users/{user_id}/messages/{id}",
            get(messages::get_message).post(messages::delete_message),
        )
        .route("/api/users/{user_id}/messages/{id}/read", post(messages::mark_as_read))
        .route_layer(from_fn_with_state(state.clone(), track_activity))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10 MB photo uploads
        .layer(CatchPanicLayer::custom(error::panic_response))
        .with_state(state)
}

pub const PAGINATION: axum::http::HeaderName = axum::http::HeaderName::from_static("pagination");

/// JSON array body plus the `Pagination` header describing the page.
pub(crate) fn paged_response<T: serde::Serialize>(
    header: kindred_types::api::PaginationHeader,
    items: Vec<T>,
) -> Result<axum::response::Response, error::ApiError> {
    use axum::response::IntoResponse;

    let value = serde_json::to_string(&header).map_err(anyhow::Error::from)?;
    let value = axum::http::HeaderValue::from_str(&value).map_err(anyhow::Error::from)?;
    Ok(([(PAGINATION, value)], axum::Json(items)).into_response())
}
