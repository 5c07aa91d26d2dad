use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cinebridge_core::error::{ApiError, ErrorEnvelope};
use cinebridge_gateway::GatewayError;
use cinebridge_playback::PlaybackError;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
#[derive(Debug)]
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let envelope = ErrorEnvelope::from(&self.0);
        (status, Json(envelope)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        Self(e.into())
    }
}

impl From<PlaybackError> for AppError {
    fn from(e: PlaybackError) -> Self {
        Self(e.into())
    }
}
