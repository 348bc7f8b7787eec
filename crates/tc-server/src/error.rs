//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`tc_core::Error`] so that route handlers
//! can return `Result<T, AppError>` directly.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: tc_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: tc_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn inner(&self) -> &tc_core::Error {
        &self.inner
    }
}

impl From<tc_core::Error> for AppError {
    fn from(e: tc_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        // Unsatisfiable ranges carry no body, only the resource size.
        if let tc_core::Error::RangeNotSatisfiable { size } = self.inner {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
                Body::empty(),
            )
                .into_response();
        }

        let code = match &self.inner {
            tc_core::Error::NotIndexed(_) => "not_indexed",
            tc_core::Error::NotFound { .. } => "not_found",
            tc_core::Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            tc_core::Error::Unauthorized(_) => "unauthorized",
            tc_core::Error::Validation(_) => "validation_error",
            tc_core::Error::Catalog(_) => "catalog_error",
            tc_core::Error::Io { .. } => "io_error",
            tc_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
            "request_id": self.request_id,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
