//! Catalog administration: `POST /api/catalog/reload`.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use tc_core::Error;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub videos: usize,
}

/// POST /api/catalog/reload
///
/// Re-reads the taxonomy on a blocking thread. In-flight requests keep the
/// snapshot they started with.
pub async fn reload_catalog(
    State(ctx): State<AppContext>,
) -> Result<Json<ReloadResponse>, AppError> {
    let store = ctx.catalog.clone();
    let videos = tokio::task::spawn_blocking(move || store.reload())
        .await
        .map_err(|e| Error::Internal(format!("reload task failed: {e}")))??;
    Ok(Json(ReloadResponse { videos }))
}
