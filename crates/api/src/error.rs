//! HTTP error mapping: a local newtype over `ChronarcError` so we can
//! `impl IntoResponse` without running into the orphan rule.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chronarc_domain::ChronarcError;

#[derive(Debug)]
pub struct ApiError(pub ChronarcError);

impl From<ChronarcError> for ApiError {
    fn from(err: ChronarcError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
