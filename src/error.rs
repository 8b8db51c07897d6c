// Per-request error taxonomy for the analysis endpoint.
//
// Every variant renders as `{"detail": "<message>"}` so clients see one error
// shape regardless of where the request failed. Messages never carry stack
// traces or the resolved filesystem layout.

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors a single analysis request can end with.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The resolved path escapes the configured safe root.
    #[error("Path outside SAFE_ROOT")]
    InvalidPath,

    /// The path is inside the safe root but is not an existing file.
    #[error("File not found")]
    NotFound,

    /// Decoding, tempo estimation (after fallback) or key estimation failed.
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// The request body could not be parsed into an analysis request.
    #[error("{}", .0.body_text())]
    Rejected(#[from] JsonRejection),
}

/// JSON body for every non-2xx response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidPath => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Analyzer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Rejected(rejection) => rejection.status(),
        }
    }

    /// Wrap a backend failure message.
    pub fn analyzer(message: impl Into<String>) -> Self {
        ServiceError::Analyzer(message.into())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
