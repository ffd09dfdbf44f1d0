use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use markr_core::MarkrError;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub code: &'static str,
    pub message: &'static str,
}

impl SuccessBody {
    pub fn submitted() -> Self {
        Self {
            code: "SUCCESS",
            message: "Request has been submitted.",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub suggestion: &'static str,
}

impl ErrorBody {
    pub fn bad_request(message: String) -> Self {
        Self {
            code: "BAD_REQUEST",
            message,
            suggestion: "Please check user documentation.",
        }
    }

    pub fn not_found() -> Self {
        Self {
            code: "RESOURCE_NOT_FOUND",
            message: "The requested resource was not found.".into(),
            suggestion: "Please check user documentation for the correct path.",
        }
    }

    pub fn server_error() -> Self {
        Self {
            code: "SERVER_ERROR",
            message: "Current request cannot be processed.".into(),
            suggestion: "Please check user documentation.",
        }
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Markr(MarkrError),
    Internal(String),
}

impl From<MarkrError> for ApiError {
    fn from(e: MarkrError) -> Self {
        Self::Markr(e)
    }
}

impl ApiError {
    pub fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            Self::Markr(MarkrError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, ErrorBody::bad_request(message))
            }
            Self::Markr(MarkrError::NotFound(path)) => {
                debug!("no route for {path}");
                (StatusCode::NOT_FOUND, ErrorBody::not_found())
            }
            Self::Markr(e) => {
                error!("request failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::server_error())
            }
            Self::Internal(detail) => {
                error!("request failed: {detail}");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::server_error())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
