use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use csvql_core::EngineError;
use serde_json::json;

use crate::auth::AuthError;

/// The HTTP-facing error envelope (spec §7): every non-2xx response is
/// `{"detail": "<message>"}`, same as the original FastAPI app's exception
/// handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Protocol(String),
    /// A missing, malformed, or expired bearer token on a route that rejects
    /// with 401 rather than `/auth/refresh`'s 403 (spec §4.9 point 1, §6).
    #[error("{0}")]
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Engine(e) if e.is_validation() => (StatusCode::BAD_REQUEST, e.message().to_string()),
            ApiError::Engine(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.message().to_string()),
            ApiError::Auth(AuthError::BadCredentials) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Auth(AuthError::InvalidToken) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Protocol(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        };
        (status, axum::Json(json!({ "detail": message }))).into_response()
    }
}
