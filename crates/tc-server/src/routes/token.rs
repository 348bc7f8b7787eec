//! Token issuance: `POST /token`.

use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;

use crate::auth::{self, IssuedToken};
use crate::context::AppContext;
use crate::error::AppError;

/// OAuth2 password-grant style form body.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// POST /token
pub async fn issue_token(
    State(ctx): State<AppContext>,
    Form(form): Form<TokenRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    if ctx.auth.enforcing() {
        auth::check_credentials(&ctx.config.auth, &form.username, &form.password)
            .inspect_err(|_| tracing::warn!("Failed login for {:?}", form.username))?;
    }

    let token = ctx.auth.issue(&form.username)?;
    tracing::info!("Issued token for {}", form.username);
    Ok(Json(token))
}
