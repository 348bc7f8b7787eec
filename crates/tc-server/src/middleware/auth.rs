//! Authentication middleware.
//!
//! Protected API routes require `Authorization: Bearer <token>`. Media routes
//! also accept `?token=<token>`, since a `<video src>` URL cannot carry
//! headers. On success the resolved [`Identity`] is inserted into request
//! extensions.

use axum::extract::{Query, State};
use axum::http::{header, Request, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::auth::{AuthGate, Identity};
use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Extract the token from an `Authorization: Bearer` header value.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extract the `token` query parameter from a request URI.
pub fn query_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|token| !token.is_empty())
}

/// Resolve the first credential present, preferring the header.
pub fn authenticate(
    gate: &dyn AuthGate,
    header_token: Option<&str>,
    query_token: Option<&str>,
) -> tc_core::Result<Identity> {
    match header_token.or(query_token) {
        Some(token) => gate.verify(token),
        None if !gate.enforcing() => Ok(Identity::anonymous()),
        None => Err(tc_core::Error::Unauthorized("missing bearer token".into())),
    }
}

fn reject(request_id: Option<RequestId>, err: tc_core::Error) -> Response {
    tracing::warn!("Rejected request: {err}");
    let mut err = AppError::new(err);
    if let Some(RequestId(id)) = request_id {
        err = err.with_request_id(id);
    }
    err.into_response()
}

async fn run_authenticated(
    ctx: AppContext,
    mut request: Request<axum::body::Body>,
    next: Next,
    allow_query: bool,
) -> Response {
    let header_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| bearer_token(Some(v)))
        .map(str::to_owned);

    let from_query = if allow_query {
        query_token(request.uri())
    } else {
        None
    };

    match authenticate(ctx.auth.as_ref(), header_token.as_deref(), from_query.as_deref()) {
        Ok(identity) => {
            tracing::debug!(subject = %identity.subject, "Authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => reject(request.extensions().get::<RequestId>().cloned(), err),
    }
}

/// Require a bearer header.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    run_authenticated(ctx, request, next, false).await
}

/// Require a bearer header or a `token` query parameter.
pub async fn media_auth_middleware(
    State(ctx): State<AppContext>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    run_authenticated(ctx, request, next, true).await
}
