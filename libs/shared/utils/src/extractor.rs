use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequest, FromRequestParts, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

const USER_COLUMNS: &str = "id,email,phone,first_name,last_name,role,language,is_verified,created_at";

pub fn bearer_token(value: &str) -> Option<&str> {
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

/// Validates the bearer token, reloads the user row and stores `AuthUser`
/// in request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = bearer_token(auth_value)
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = authenticate(&state, token).await?;
    debug!("Authenticated {} as {}", user.id, user.role);

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Token check shared by the HTTP middleware and the websocket handshake.
pub async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = validate_token(token, &state.config.jwt_secret).map_err(AppError::Auth)?;

    let query = format!("id=eq.{}&select={}", claims.sub, USER_COLUMNS);
    let user: Option<AuthUser> = state
        .db
        .select_one("users", &query)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to load user: {}", e)))?;

    user.ok_or_else(|| AppError::Auth("User not found".to_string()))
}

pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Access denied for role {}",
            user.role
        )))
    }
}

// Drop-in replacements for `Json`, `Path` and `Query` whose rejections go
// through `AppError`, so malformed input gets the usual 400 body.

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
