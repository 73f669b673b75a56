use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info};

use kindred_db::ChangeSet;
use kindred_db::models::PhotoRow;
use kindred_types::api::Claims;

use crate::error::ApiError;
use crate::mapping;
use crate::middleware::ensure_caller;
use crate::state::{AppState, run_db};

pub async fn get_photo(
    State(state): State<AppState>,
    Path((_user_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = run_db(&state, move |db| db.get_photo(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(mapping::photo_for_return(photo)))
}

/// Multipart upload with a `file` part and an optional `description`.
/// The first photo a user adds becomes their main photo.
pub async fn add_photo(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let owner = run_db(&state, move |db| db.get_user(user_id))
        .await?
        .ok_or_else(|| ApiError::bad_request("Could not find user!"))?;

    ensure_caller(&claims, user_id)?;

    let mut file: Option<(String, Bytes)> = None;
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                file = Some((file_name, data));
            }
            Some("description") => {
                description = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
            }
            other => debug!("Ignored field in photo upload: {:?}", other),
        }
    }

    let (file_name, data) = file
        .filter(|(_, data)| !data.is_empty())
        .ok_or_else(|| ApiError::bad_request("No file was uploaded"))?;

    let uploaded = state.media.upload(file_name, data).await?;

    let mut photo = PhotoRow {
        id: 0,
        url: uploaded.url,
        public_id: Some(uploaded.public_id),
        description,
        date_added: Utc::now(),
        is_main: owner.main_photo().is_none(),
        user_id,
    };

    let mut changes = ChangeSet::new();
    let staged = changes.add(photo.clone());
    let saved = run_db(&state, move |db| db.save_all(changes)).await?;

    photo.id = saved
        .id(staged)
        .ok_or_else(|| ApiError::bad_request("Could not add the photo"))?;
    info!("User {} added photo {}", user_id, photo.id);

    let location = format!("/api/users/{}/photos/{}", user_id, photo.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(mapping::photo_for_return(photo)),
    ))
}

/// Makes `id` the owner's main photo, demoting the current one in the same
/// save.
pub async fn set_main_photo(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(i64, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    ensure_caller(&claims, user_id)?;

    let (photo, current_main) = run_db(&state, move |db| {
        let photo = db.get_photo(id)?;
        let current_main = db.get_main_photo_for_user(user_id)?;
        Ok((photo, current_main))
    })
    .await?;

    let mut photo = photo.ok_or(ApiError::NotFound)?;
    if photo.user_id != user_id {
        return Err(ApiError::Unauthorized);
    }
    if photo.is_main {
        return Err(ApiError::bad_request("This is already the main photo!"));
    }

    let mut changes = ChangeSet::new();
    if let Some(mut current) = current_main {
        current.is_main = false;
        changes.update(current);
    }
    photo.is_main = true;
    changes.update(photo);

    let saved = run_db(&state, move |db| db.save_all(changes)).await?;
    if !saved.any() {
        return Err(ApiError::bad_request("Could not set photo to main"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Removes the remote image first; the row goes only if the host confirms.
pub async fn delete_photo(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(i64, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    ensure_caller(&claims, user_id)?;

    let photo = run_db(&state, move |db| db.get_photo(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    if photo.user_id != user_id {
        return Err(ApiError::Unauthorized);
    }
    if photo.is_main {
        return Err(ApiError::bad_request("You cannot delete the main photo!"));
    }

    if let Some(public_id) = photo.public_id.clone() {
        if !state.media.destroy(public_id).await? {
            return Err(ApiError::bad_request("Failed to delete the photo!"));
        }
    }

    let mut changes = ChangeSet::new();
    changes.delete(photo);
    let saved = run_db(&state, move |db| db.save_all(changes)).await?;

    if !saved.any() {
        return Err(ApiError::bad_request("Failed to delete the photo!"));
    }
    info!("User {} deleted photo {}", user_id, id);
    Ok(StatusCode::OK)
}
