//! Handler error type. Each variant maps to one status code and body shape;
//! unexpected failures travel as [`ApiError::Internal`] and are logged once,
//! when the response is built.

use std::any::Any;
use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub const APPLICATION_ERROR: HeaderName = HeaderName::from_static("application-error");

/// Validation messages keyed by request field.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            ApiError::Internal(e) => tracing::error!(error = ?e, "Internal server error"),
            _ => tracing::debug!(error = %self, status = %self.status_code(), "Request rejected"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();

        match self {
            ApiError::Validation(errors) => (status, Json(json!({ "errors": errors }))).into_response(),
            ApiError::BadRequest(message) => (status, Json(json!({ "message": message }))).into_response(),
            ApiError::Unauthorized | ApiError::NotFound => status.into_response(),
            ApiError::Internal(e) => internal_response(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation(body_field_errors(&e.body_text())),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

/// Splits a body deserialization message into the offending field and the
/// reason. `missing field `x`` and `path: reason` name the field; anything
/// else lands under `body`.
fn body_field_errors(text: &str) -> FieldErrors {
    let detail = text
        .strip_prefix("Failed to deserialize the JSON body into the target type: ")
        .unwrap_or(text);
    let mut errors = FieldErrors::default();

    if let Some((field, _)) = detail
        .split("missing field `")
        .nth(1)
        .and_then(|rest| rest.split_once('`'))
    {
        errors.add(field, format!("The {} field is required.", field));
        return errors;
    }

    match detail.split_once(": ") {
        Some((path, reason)) if !path.contains(' ') && path != "." => errors.add(path, reason),
        _ => errors.add("body", detail),
    }
    errors
}

/// Response for a handler that panicked; same shape as any other 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    tracing::error!(panic = %message, "Handler panicked");
    internal_response(message)
}

fn internal_response(message: String) -> Response {
    // Header values cannot carry control characters.
    let header = HeaderValue::from_str(&message.replace(['\r', '\n'], " "))
        .unwrap_or_else(|_| HeaderValue::from_static("Internal server error"));

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(APPLICATION_ERROR, header)],
        message,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::default();
        assert!(errors.is_empty());

        errors.add("password", "too short");
        errors.add("password", "too weak");
        errors.add("username", "taken");

        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["password"], json!(["too short", "too weak"]));
        assert_eq!(value["username"], json!(["taken"]));
        assert!(matches!(errors.into_result(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn body_errors_name_the_field() {
        let missing = body_field_errors(
            "Failed to deserialize the JSON body into the target type: missing field `password` at line 1 column 17",
        );
        let value = serde_json::to_value(&missing).unwrap();
        assert_eq!(value["password"], json!(["The password field is required."]));

        let invalid = body_field_errors(
            "Failed to deserialize the JSON body into the target type: dateOfBirth: input contains invalid characters at line 1 column 50",
        );
        let value = serde_json::to_value(&invalid).unwrap();
        assert_eq!(
            value["dateOfBirth"],
            json!(["input contains invalid characters at line 1 column 50"])
        );

        let other = body_field_errors("invalid type: integer `3`, expected a string at line 1 column 1");
        let value = serde_json::to_value(&other).unwrap();
        assert!(value["body"].is_array());
    }

    #[test]
    fn internal_errors_carry_the_header() {
        let response = ApiError::Internal(anyhow::anyhow!("disk on fire")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[APPLICATION_ERROR], "disk on fire");
    }

    #[test]
    fn panic_payloads_become_500s() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[APPLICATION_ERROR], "boom");
    }
}
