//! HTTP error mapping for the JSON surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use toolcast_core::error::ToolcastError;

/// Wire shape for JSON-surface errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

/// Status mapping for the runtime error taxonomy
pub fn status_code(error: &ToolcastError) -> StatusCode {
    match error {
        ToolcastError::UnknownTool { .. }
        | ToolcastError::UnknownPrompt { .. }
        | ToolcastError::UnknownToolset { .. } => StatusCode::NOT_FOUND,
        ToolcastError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        ToolcastError::MissingAuthClaim { .. }
        | ToolcastError::MissingParameter { .. }
        | ToolcastError::InvalidParameter { .. }
        | ToolcastError::Template { .. } => StatusCode::BAD_REQUEST,
        ToolcastError::Backend { .. } | ToolcastError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Newtype so the error can be returned straight from handlers
pub struct ApiError(pub ToolcastError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(&self.0);
        let body = ErrorBody {
            error: self.0.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ToolcastError> for ApiError {
    fn from(error: ToolcastError) -> Self {
        ApiError(error)
    }
}
