use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use kindred_db::models::LikeRow;
use kindred_db::{ChangeSet, PageRequest, UserFilter, UserOrder};
use kindred_types::api::{Claims, UserForUpdate};
use kindred_types::params::UserParams;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::mapping;
use crate::middleware::ensure_caller;
use crate::paged_response;
use crate::state::{AppState, run_db};

/// Gender shown when the caller does not ask for one.
fn opposite_gender(gender: &str) -> &'static str {
    if gender == "male" { "female" } else { "male" }
}

pub async fn get_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<UserParams>,
) -> Result<Response, ApiError> {
    let user_id = claims.nameid;
    let today = Utc::now().date_naive();

    let page = run_db(&state, move |db| {
        let gender = match params.gender {
            Some(gender) => gender,
            None => {
                let caller_gender = db
                    .get_user(user_id)?
                    .map(|u| u.user.gender)
                    .unwrap_or_default();
                opposite_gender(&caller_gender).to_string()
            }
        };

        db.get_users(&UserFilter {
            user_id,
            gender,
            min_age: params.min_age,
            max_age: params.max_age,
            order: UserOrder::parse(params.order_by.as_deref()),
            likers: params.likers,
            likees: params.likees,
            today,
            page: PageRequest::new(params.page_number, params.page_size),
        })
    })
    .await?;

    let header = mapping::pagination_header(&page);
    let users = page
        .items
        .into_iter()
        .map(|u| mapping::user_for_list(u, today))
        .collect::<Vec<_>>();
    paged_response(header, users)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_db(&state, move |db| db.get_user(user_id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(mapping::user_for_detail(user, Utc::now().date_naive())))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(update): ApiJson<UserForUpdate>,
) -> Result<StatusCode, ApiError> {
    ensure_caller(&claims, user_id)?;

    let mut user = run_db(&state, move |db| db.get_user(user_id))
        .await?
        .ok_or(ApiError::NotFound)?
        .user;

    user.introduction = update.introduction;
    user.looking_for = update.looking_for;
    user.interests = update.interests;
    user.city = update.city;
    user.country = update.country;

    let mut changes = ChangeSet::new();
    changes.update(user);
    let saved = run_db(&state, move |db| db.save_all(changes)).await?;

    if !saved.any() {
        return Err(ApiError::bad_request(format!("Updating user {} failed on save", user_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_user(
    State(state): State<AppState>,
    Path((user_id, recipient_id)): Path<(i64, i64)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    ensure_caller(&claims, user_id)?;

    if run_db(&state, move |db| db.get_like(user_id, recipient_id)).await?.is_some() {
        return Err(ApiError::bad_request("You already like this user"));
    }

    if run_db(&state, move |db| db.get_user(recipient_id)).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let mut changes = ChangeSet::new();
    changes.add(LikeRow {
        liker_id: user_id,
        likee_id: recipient_id,
    });
    let saved = run_db(&state, move |db| db.save_all(changes)).await?;

    if !saved.any() {
        return Err(ApiError::bad_request("Failed to like user"));
    }
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gender_is_the_opposite() {
        assert_eq!(opposite_gender("male"), "female");
        assert_eq!(opposite_gender("female"), "male");
        assert_eq!(opposite_gender(""), "male");
    }
}
