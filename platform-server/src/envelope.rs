//! The `{success, message, data}` envelope every handler returns, plus the
//! mapping from `ApiError` to a concrete status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use platform_core::error::StatusHint;
use platform_core::ApiError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Build a success response with a body.
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(Envelope {
            success: true,
            message: "ok".to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

/// Build a success response with no body.
pub fn ok_empty(status: StatusCode) -> Response {
    (
        status,
        Json(Envelope::<()> {
            success: true,
            message: "ok".to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Map an `ApiError` to its status code and wrap it in the envelope.
pub fn api_error(error: ApiError) -> Response {
    let status = match error.status_hint() {
        StatusHint::BadRequest => StatusCode::BAD_REQUEST,
        StatusHint::Unauthorized => StatusCode::UNAUTHORIZED,
        StatusHint::NotFound => StatusCode::NOT_FOUND,
        StatusHint::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(Envelope::<()> {
            success: false,
            message: error.to_string(),
            data: None,
        }),
    )
        .into_response()
}
