//! Media route: `GET /api/video?path=<key>`.

use std::path::Path;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use serde::Deserialize;

use tc_core::Error;

use crate::context::AppContext;
use crate::error::AppError;

use super::streaming_helpers::serve_range;

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub path: String,
    /// Consumed by the media auth middleware; accepted here so it does not
    /// trip query validation.
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /api/video
///
/// Only keys present in the current catalog snapshot are served.
pub async fn get_video(
    State(ctx): State<AppContext>,
    Query(query): Query<VideoQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !ctx.catalog.snapshot().contains(&query.path) {
        tracing::warn!("Refusing to stream unindexed path {}", query.path);
        return Err(Error::NotIndexed(query.path).into());
    }

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    serve_range(Path::new(&query.path), range_header)
        .await
        .map_err(|e| {
            if matches!(e, Error::NotFound { .. }) {
                tracing::warn!("Indexed video missing on disk: {}", query.path);
            }
            AppError::from(e)
        })
}
