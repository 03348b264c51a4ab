//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use chess_duel_core::Error;

#[derive(Debug)]
pub enum ApiError {
    /// No `x-player-id` header.
    Unauthorized,
    BadRequest(String),
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                Error::NotAParticipant | Error::Forbidden => StatusCode::FORBIDDEN,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Conflict(_) => StatusCode::CONFLICT,
                Error::Database(_) | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Core(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "missing x-player-id header".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Core(err) if !err.is_client_error() => "internal error".to_string(),
            ApiError::Core(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Core(err) = &self {
            if status.is_server_error() {
                tracing::error!(error = %err, "request failed");
            }
        }
        let body = json!({ "error": self.message(), "code": self.code() });
        (status, Json(body)).into_response()
    }
}
