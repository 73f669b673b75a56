use axum::{
    Json,
    extract::{FromRequest, Request},
};

use crate::error::ApiError;

/// `Json` whose rejections are answered as [`ApiError`]s: data errors as
/// 400 field errors, everything else as a 400 with the reason.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
