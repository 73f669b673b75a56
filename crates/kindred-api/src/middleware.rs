use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, warn};

use kindred_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// Extract and validate the bearer token; the claims go into request
/// extensions for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.tokens.validate(token).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Records the caller's last activity once the handler has finished,
/// whatever the outcome.
pub async fn track_activity(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let user_id = req.extensions().get::<Claims>().map(|c| c.nameid);
    let response = next.run(req).await;

    if let Some(user_id) = user_id {
        let now = Utc::now();
        if let Err(e) = run_db(&state, move |db| db.touch_last_active(user_id, now)).await {
            warn!("Failed to record activity for user {}: {}", user_id, e);
        }
    }

    response
}

/// Route user ids must name the caller.
pub fn ensure_caller(claims: &Claims, user_id: i64) -> Result<(), ApiError> {
    if claims.nameid == user_id {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}
