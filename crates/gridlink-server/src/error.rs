//! Error types for the hand-off ingress.
//!
//! [`ApiError`] converts into an HTTP response whose body is a
//! [`HandoffResponse`] with `success: false`, so remote callers always get
//! the same shape back.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gridlink_types::{HandoffResponse, RegionId};

/// Errors that can occur while handling an ingress request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The named region is not hosted here.
    #[error("region {0} is not hosted here")]
    UnknownRegion(RegionId),

    /// The request contradicts itself (e.g. path and body disagree).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownRegion(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, axum::Json(HandoffResponse::refused(self.to_string()))).into_response()
    }
}
