use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;
use shared_utils::extractor::{require_role, ApiJson, ApiPath, ApiQuery};
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;
use shared_utils::validation::validate_request;

use crate::models::{BookingListQuery, UserListQuery, VerifyUserRequest};
use crate::services::AdminService;

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let (users, pagination) = AdminService::new(state.db.clone())
        .list_users(&query)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "users": users, "pagination": pagination }
    })))
}

#[axum::debug_handler]
pub async fn verify_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<VerifyUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;
    validate_request(&state, &locale, &request)?;

    let updated = AdminService::new(state.db.clone())
        .set_verification(user_id, request.is_verified.unwrap_or_default())
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "admin.user_verified", "User verification updated"),
        "data": { "user": updated }
    })))
}

#[axum::debug_handler]
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let analytics = AdminService::new(state.db.clone())
        .analytics()
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({ "success": true, "data": analytics })))
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let (bookings, pagination) = AdminService::new(state.db.clone())
        .list_bookings(&query)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "bookings": bookings, "pagination": pagination }
    })))
}
