use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::core::ExecutorError;

/// Sentinel carrying an explicit 400 through the `anyhow::Error` chain
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

/// Unified error type for HTTP responses
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    pub fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<BadRequestError>().is_some() {
            StatusCode::BAD_REQUEST
        } else {
            // Enrichment failures and anything unexpected.
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "Request failed");
        } else {
            tracing::warn!(error = %self.0, "Rejected request");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ExecutorError> for AppError {
    fn from(err: ExecutorError) -> Self {
        Self(anyhow::Error::new(err).context("Failed to enrich alerts"))
    }
}
