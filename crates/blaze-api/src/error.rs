//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

use blaze_media::MediaError;
use blaze_models::EncodeAttempt;
use blaze_session::SessionError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Session(SessionError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Media(MediaError::SourceUnreadable { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Media(MediaError::EncodeFailure { .. })
            | ApiError::Media(MediaError::BudgetExceeded { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal",
            ApiError::Session(SessionError::Conflict(_)) => "session_conflict",
            ApiError::Session(SessionError::NotFound(_)) => "session_not_found",
            ApiError::Media(MediaError::SourceUnreadable { .. }) => "source_unreadable",
            ApiError::Media(MediaError::EncodeFailure { .. }) => "encode_failure",
            ApiError::Media(MediaError::BudgetExceeded { .. }) => "budget_exceeded",
            ApiError::Media(_) => "media_error",
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hard_cap_kb: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<EncodeAttempt>,
    /// Base64 of the oversized JPEG
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Don't expose internal error details in production
        let detail = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let (size_bytes, hard_cap_kb) = match &self {
            ApiError::Media(MediaError::BudgetExceeded {
                size_bytes,
                hard_cap_kb,
                ..
            }) => (Some(*size_bytes), Some(*hard_cap_kb)),
            _ => (None, None),
        };

        let (attempts, preview) = match self {
            ApiError::Media(MediaError::EncodeFailure { attempts }) => (attempts, None),
            ApiError::Media(MediaError::BudgetExceeded {
                attempts, artifact, ..
            }) => (attempts, Some(STANDARD.encode(artifact))),
            _ => (Vec::new(), None),
        };

        let body = ErrorResponse {
            detail,
            code,
            size_bytes,
            hard_cap_kb,
            attempts,
            preview,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaze_models::ChatId;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(SessionError::Conflict(ChatId(1))).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(SessionError::NotFound(ChatId(1))).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(MediaError::source_unreadable("x", "empty file")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(MediaError::EncodeFailure { attempts: Vec::new() }).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(MediaError::FfmpegNotFound("ffmpeg".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes() {
        let err = ApiError::from(MediaError::BudgetExceeded {
            size_bytes: 1,
            hard_cap_kb: 200,
            attempts: Vec::new(),
            artifact: vec![0xFF; 1],
        });
        assert_eq!(err.code(), "budget_exceeded");
        assert_eq!(ApiError::bad_request("x").code(), "bad_request");
    }
}
