use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use catalog_core::SearchError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self { Self { error: error.into(), details: None } }
}

/// Request-boundary wrapper that renders a `SearchError` as the error envelope.
#[derive(Debug)]
pub struct ApiError(pub SearchError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SearchError::Validation(_) | SearchError::Retrieval(_) | SearchError::Insert { .. } => StatusCode::BAD_REQUEST,
            SearchError::ProviderAuth(_) | SearchError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SearchError::ProviderUpstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self.0, "request failed");
        } else {
            warn!(%status, error = %self.0, "request rejected");
        }
        let body = ErrorBody { error: self.0.to_string(), details: self.0.details().cloned() };
        (status, Json(body)).into_response()
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}
