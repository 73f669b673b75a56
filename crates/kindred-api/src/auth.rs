use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use kindred_db::models::{NewUser, UserWithPhotos};
use kindred_types::api::{LoginRequest, LoginResponse, RegisterRequest};

use crate::error::{ApiError, FieldErrors};
use crate::extract::ApiJson;
use crate::mapping;
use crate::state::{AppState, run_db};

const PASSWORD_LENGTH: std::ops::RangeInclusive<usize> = 4..=8;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_lowercase();

    // Validate input
    let mut errors = FieldErrors::default();
    if username.is_empty() {
        errors.add("username", "The Username field is required.");
    }
    let password_len = req.password.chars().count();
    if password_len == 0 {
        errors.add("password", "The Password field is required.");
    } else if !PASSWORD_LENGTH.contains(&password_len) {
        errors.add("password", "You must specify password between 4 and 8 characters");
    }

    // Check if username is taken
    if !username.is_empty() {
        let candidate = username.clone();
        if run_db(&state, move |db| db.user_exists(&candidate)).await? {
            errors.add("username", "Username already exists");
        }
    }
    errors.into_result()?;

    let new_user = NewUser {
        username,
        gender: req.gender.unwrap_or_default(),
        date_of_birth: req.date_of_birth,
        known_as: req.known_as.unwrap_or_default(),
        city: req.city.unwrap_or_default(),
        country: req.country.unwrap_or_default(),
        ..Default::default()
    };
    let password = req.password;
    let user = run_db(&state, move |db| db.register(new_user, &password)).await?;
    info!("Registered user {} ({})", user.username, user.id);

    let location = format!("/api/users/{}", user.id);
    let body = mapping::user_for_detail(
        UserWithPhotos {
            user,
            photos: Vec::new(),
        },
        Utc::now().date_naive(),
    );

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(body)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.to_lowercase();
    let password = req.password;

    let user = run_db(&state, move |db| {
        let Some(user) = db.login(&username, &password)? else {
            return Ok(None);
        };
        db.get_user(user.id)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    let token = state.tokens.issue(user.user.id, &user.user.username)?;

    Ok(Json(LoginResponse {
        token,
        user: mapping::user_for_list(user, Utc::now().date_naive()),
    }))
}
