use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{AuthUser, Role};
use shared_models::error::AppError;
use shared_utils::extractor::{require_role, ApiPath, ApiQuery};
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;
use shared_utils::uploads::MultipartForm;

use crate::models::{PaymentHistoryQuery, SubmitPaymentForm};
use crate::services::PaymentService;

#[axum::debug_handler]
pub async fn get_payment_phone(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": { "phone": state.config.payment_phone }
    }))
}

#[axum::debug_handler]
pub async fn submit_payment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Client])?;
    let mut form = MultipartForm::read(multipart).await?;

    let payment = async {
        let screenshot = form.take_file("screenshot");
        let fields = SubmitPaymentForm::from_form(&form)?;
        PaymentService::new(state.db.clone())
            .submit(&user, fields, screenshot, &state.uploads)
            .await
    }
    .await
    .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(
            locale.as_str(),
            "payment.submitted_successfully",
            "Payment submitted successfully. We will verify your payment and update the booking status."
        ),
        "data": { "payment": payment }
    })))
}

#[axum::debug_handler]
pub async fn get_pending_payments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;

    let payments = PaymentService::new(state.db.clone())
        .pending_for_doctor(&user)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "payments": payments }
    })))
}

#[axum::debug_handler]
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(payment_id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;

    let payment = PaymentService::new(state.db.clone())
        .verify(&user, payment_id)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "payment.verified_successfully", "Payment verified successfully"),
        "data": { "payment": payment }
    })))
}

#[axum::debug_handler]
pub async fn get_payment_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiQuery(query): ApiQuery<PaymentHistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let (payments, pagination) = PaymentService::new(state.db.clone())
        .history(&user, &query)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "payments": payments, "pagination": pagination }
    })))
}
