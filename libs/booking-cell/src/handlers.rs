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

use crate::models::{
    BookingListQuery, CreateBookingRequest, RescheduleRequest, SessionNoteRequest, UpdateStatusRequest,
};
use crate::services::{BookingService, SessionNoteService};

// ==============================================================================
// BOOKINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiJson(request): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[Role::Client])?;
    validate_request(&state, &locale, &request)?;

    let booking = BookingService::new(state.db.clone())
        .create(&user, request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": state.t(locale.as_str(), "booking.created", "Booking created successfully"),
            "data": { "booking": booking }
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_my_bookings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Result<Json<Value>, AppError> {
    let (bookings, pagination) = BookingService::new(state.db.clone())
        .list_for(&user, &query)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "bookings": bookings, "pagination": pagination }
    })))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(state.db.clone())
        .get_for(&user, booking_id)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "booking": booking }
    })))
}

#[axum::debug_handler]
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(booking_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(state.db.clone())
        .update_status(&user, booking_id, request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "booking.status_updated", "Booking status updated"),
        "data": { "booking": booking }
    })))
}

#[axum::debug_handler]
pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(booking_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Client])?;
    validate_request(&state, &locale, &request)?;

    let booking = BookingService::new(state.db.clone())
        .reschedule(&user, booking_id, request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "booking.rescheduled", "Booking rescheduled successfully"),
        "data": { "booking": booking }
    })))
}

// ==============================================================================
// SESSION NOTES
// ==============================================================================

#[axum::debug_handler]
pub async fn upsert_session_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(booking_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<SessionNoteRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;
    validate_request(&state, &locale, &request)?;

    let note = SessionNoteService::new(state.db.clone())
        .upsert(&user, booking_id, request.notes.trim())
        .await
        .map_err(|e| e.into_note_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "sessionNote.updated", "Session note updated"),
        "data": { "sessionNote": note }
    })))
}

#[axum::debug_handler]
pub async fn get_session_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(booking_id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;

    let note = SessionNoteService::new(state.db.clone())
        .get(&user, booking_id)
        .await
        .map_err(|e| e.into_note_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "sessionNote": note }
    })))
}
