use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
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

use crate::models::{CreateReviewRequest, ReviewListQuery};
use crate::services::ReviewService;

#[axum::debug_handler]
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiJson(request): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[Role::Client])?;
    validate_request(&state, &locale, &request)?;

    let review = ReviewService::new(state.db.clone())
        .create(&user, request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": state.t(locale.as_str(), "review.created", "Review created successfully"),
            "data": { "review": review }
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_doctor_reviews(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiPath(doctor_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ReviewListQuery>,
) -> Result<Json<Value>, AppError> {
    let (reviews, pagination) = ReviewService::new(state.db.clone())
        .list_for_doctor(doctor_id, &query)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "reviews": reviews, "pagination": pagination }
    })))
}
