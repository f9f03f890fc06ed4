// API error type and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::llm::LlmError;

/// Errors returned by the `/api` handlers as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request (400).
    #[error("{0}")]
    BadRequest(String),

    /// The model answered with a move that is not legal in the position (422).
    #[error("AI tried to make an illegal move: {mv}")]
    IllegalAiMove { mv: String },

    /// The provider call or reply parsing failed (500).
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::IllegalAiMove { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::UnsupportedModel(_) | LlmError::MissingApiKey(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        warn!(%status, %message, "request failed");

        let body = match self {
            ApiError::IllegalAiMove { mv } => json!({ "error": message, "move": mv }),
            _ => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Provider;
    use crate::llm::reply::ReplyError;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::IllegalAiMove { mv: "e2e5".into() }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Upstream("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn llm_errors_map_to_client_or_server_faults() {
        let e: ApiError = LlmError::UnsupportedModel("llama".into()).into();
        assert!(matches!(e, ApiError::BadRequest(ref m) if m == "Unsupported model"));

        let e: ApiError = LlmError::MissingApiKey(Provider::Gemini).into();
        assert!(matches!(e, ApiError::BadRequest(ref m) if m == "Missing API Key"));

        let e: ApiError = LlmError::Reply(ReplyError::NoJson).into();
        assert!(
            matches!(e, ApiError::Upstream(ref m) if m == "Could not parse JSON from model response")
        );

        let e: ApiError = LlmError::Timeout(30).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn illegal_move_message() {
        let e = ApiError::IllegalAiMove { mv: "e2e5".into() };
        assert_eq!(e.to_string(), "AI tried to make an illegal move: e2e5");
    }
}
