//! Bearer-token authentication middleware.
//!
//! Compares the presented token against the configured API secrets and
//! inserts an [`Auth`] context into request extensions. When authentication
//! is disabled an empty context is inserted so downstream handlers can still
//! extract `Auth` and treat the caller as anonymous.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::Auth;
use crate::errors::auth_error::AuthError;
use crate::state::AppState;

/// Extract the bearer token from the Authorization header.
fn extract_token(request: &Request) -> Result<String, AuthError> {
    let auth_header = request
        .headers()
        .get("authorization")
        .ok_or(AuthError::MissingAuthHeader)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or(AuthError::InvalidAuthHeader)
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Skip authentication if auth is not required. Still insert an empty
    // Auth so handlers that need the context keep working.
    if !state.config.auth_required {
        tracing::debug!("authentication disabled, inserting empty Auth context");
        request.extensions_mut().insert(Auth::empty());
        return Ok(next.run(request).await);
    }

    let token = extract_token(&request)?;

    let matched = state
        .config
        .auth_api_secrets
        .iter()
        .find(|entry| entry.secret == token)
        .ok_or(AuthError::InvalidToken)?;

    tracing::debug!(
        client_id = %matched.id,
        path = %request.uri().path(),
        "API secret authentication succeeded"
    );
    request
        .extensions_mut()
        .insert(Auth::authenticated(matched.id.clone()));
    Ok(next.run(request).await)
}
