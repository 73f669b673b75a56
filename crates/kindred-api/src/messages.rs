use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use kindred_db::models::MessageRow;
use kindred_db::{ChangeSet, MessageContainer, MessageFilter, PageRequest};
use kindred_types::api::{Claims, MessageForCreation};
use kindred_types::params::MessageParams;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::mapping;
use crate::middleware::ensure_caller;
use crate::paged_response;
use crate::state::{AppState, run_db};

pub async fn get_message(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(i64, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_caller(&claims, user_id)?;

    let message = run_db(&state, move |db| db.get_message_view(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    let m = &message.message;
    if m.sender_id != user_id && m.recipient_id != user_id {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(mapping::message_for_return(message)))
}

/// `messageContainer` selects Inbox, Outbox or (default) Unread.
pub async fn get_messages_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MessageParams>,
) -> Result<Response, ApiError> {
    ensure_caller(&claims, user_id)?;

    let filter = MessageFilter {
        user_id,
        container: MessageContainer::parse(params.message_container.as_deref()),
        page: PageRequest::new(params.page_number, params.page_size),
    };
    let page = run_db(&state, move |db| db.get_messages_for_user(&filter)).await?;

    let header = mapping::pagination_header(&page);
    let messages = page
        .items
        .into_iter()
        .map(mapping::message_for_return)
        .collect::<Vec<_>>();
    paged_response(header, messages)
}

pub async fn get_message_thread(
    State(state): State<AppState>,
    Path((user_id, recipient_id)): Path<(i64, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_caller(&claims, user_id)?;

    let thread = run_db(&state, move |db| db.get_message_thread(user_id, recipient_id)).await?;

    Ok(Json(
        thread
            .into_iter()
            .map(mapping::message_for_return)
            .collect::<Vec<_>>(),
    ))
}

pub async fn create_message(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<MessageForCreation>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_caller(&claims, user_id)?;

    let recipient_id = req.recipient_id;
    if run_db(&state, move |db| db.get_user(recipient_id)).await?.is_none() {
        return Err(ApiError::bad_request("Could not find user!"));
    }

    let mut changes = ChangeSet::new();
    let staged = changes.add(MessageRow {
        id: 0,
        sender_id: user_id,
        recipient_id,
        content: req.content,
        is_read: false,
        message_read_time: None,
        message_sent_time: Utc::now(),
        sender_deleted: false,
        recipient_deleted: false,
    });

    let message = run_db(&state, move |db| {
        let saved = db.save_all(changes)?;
        match saved.id(staged) {
            Some(id) => db.get_message_view(id),
            None => Ok(None),
        }
    })
    .await?
    .ok_or_else(|| ApiError::bad_request("Creating the message failed on save"))?;

    let location = format!("/api/users/{}/messages/{}", user_id, message.message.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(mapping::message_for_return(message)),
    ))
}

/// Soft-deletes the caller's copy. The row is removed once both
/// participants have deleted it.
pub async fn delete_message(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(i64, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    ensure_caller(&claims, user_id)?;

    let mut message = run_db(&state, move |db| db.get_message(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    if !message.mark_deleted_by(user_id) {
        return Err(ApiError::Unauthorized);
    }

    let mut changes = ChangeSet::new();
    if message.is_deleted_by_both() {
        debug!("Message {} deleted by both participants, removing", id);
        changes.delete(message);
    } else {
        changes.update(message);
    }

    let saved = run_db(&state, move |db| db.save_all(changes)).await?;
    if !saved.any() {
        return Err(ApiError::Internal(anyhow!("Error deleting message {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(i64, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    ensure_caller(&claims, user_id)?;

    let mut message = run_db(&state, move |db| db.get_message(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    if message.recipient_id != user_id {
        return Err(ApiError::bad_request("Failed to mark message as read!"));
    }

    message.is_read = true;
    message.message_read_time = Some(Utc::now());

    let mut changes = ChangeSet::new();
    changes.update(message);
    run_db(&state, move |db| db.save_all(changes)).await?;

    Ok(StatusCode::NO_CONTENT)
}
