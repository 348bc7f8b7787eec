//! Axum router construction.
//!
//! Builds the application router with its route groups, middleware layers,
//! and optional static file serving.

use std::path::PathBuf;

use axum::http::header;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::auth::{auth_middleware, media_auth_middleware};
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
        ]);

    // Bearer header only.
    let protected_routes = Router::new()
        .route("/labels", get(routes::labels::get_labels))
        .route("/catalog/reload", post(routes::catalog::reload_catalog))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware));

    // Media elements cannot set headers, so the token may ride in the query.
    let media_routes = Router::new()
        .route("/video", get(routes::video::get_video))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            media_auth_middleware,
        ));

    let api = protected_routes.merge(media_routes);

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/token", post(routes::token::issue_token))
        .nest("/api", api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                tower_http::services::ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .fallback(tower_http::services::ServeFile::new(index_path)),
            );
        } else {
            tracing::warn!("Static directory {:?} does not exist; not serving UI", dir);
        }
    }

    app
}
