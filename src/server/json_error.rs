// Server related imports
use axum::{
    extract::{rejection::JsonRejection, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};

// General imports
use serde::Serialize;

/// Failure envelope returned by every endpoint: `{success: false, error}`
#[derive(Debug, Serialize)]
pub struct JsonError {
    success: bool,
    error: String,
    #[serde(skip)]
    status: StatusCode,
}

impl JsonError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            status,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    pub fn internal(error: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut r = Json(self).into_response();
        *r.status_mut() = status;
        r
    }
}

// `Json` rejections carry plain-text bodies; keep the envelope consistent.
impl From<JsonRejection> for JsonError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}
