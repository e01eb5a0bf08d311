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
use shared_utils::uploads::{MultipartForm, UploadKind};

use crate::models::{ClientFieldsUpdate, DoctorListQuery, DoctorProfileUpdate, ProfileError, UserFieldsUpdate};
use crate::services::{DoctorService, ProfileService};

async fn store_photo(state: &AppState, form: &mut MultipartForm, kind: UploadKind) -> Result<Option<String>, ProfileError> {
    match form.take_file("photo") {
        Some(file) => Ok(Some(state.uploads.save(kind, &file).await?)),
        None => Ok(None),
    }
}

// ==============================================================================
// USER PROFILE
// ==============================================================================

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    let service = ProfileService::new(state.db.clone());

    let profile = service
        .get_profile(&user)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "profile": profile }
    })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;

    let result = async {
        let user_fields = UserFieldsUpdate::from_form(&form)?;
        let client_fields = ClientFieldsUpdate::from_form(&form)?;
        let kind = if user.is(Role::Doctor) { UploadKind::DoctorPhoto } else { UploadKind::ProfilePhoto };
        let photo = store_photo(&state, &mut form, kind).await?;

        ProfileService::new(state.db.clone())
            .update_profile(&user, user_fields, client_fields, photo)
            .await
    }
    .await
    .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "user.profile_updated", "Profile updated successfully"),
        "data": { "profile": result }
    })))
}

// ==============================================================================
// DOCTOR DIRECTORY (PUBLIC)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiQuery(query): ApiQuery<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let (doctors, pagination) = DoctorService::new(state.db.clone())
        .list_doctors(&query)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "doctors": doctors, "pagination": pagination }
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(state.db.clone())
        .get_public_doctor(user_id)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "doctor": doctor }
    })))
}

// ==============================================================================
// DOCTOR SELF-SERVICE
// ==============================================================================

#[axum::debug_handler]
pub async fn get_own_doctor_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;

    let profile = DoctorService::new(state.db.clone())
        .get_own_profile(user.id)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "doctorProfile": profile }
    })))
}

#[axum::debug_handler]
pub async fn update_doctor_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;
    let mut form = MultipartForm::read(multipart).await?;

    let profile = async {
        let user_fields = UserFieldsUpdate::from_form(&form)?;
        let update = DoctorProfileUpdate::from_form(&form)?;
        let photo = store_photo(&state, &mut form, UploadKind::DoctorPhoto).await?;

        DoctorService::new(state.db.clone())
            .update_profile(&user, user_fields, update, photo)
            .await
    }
    .await
    .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "doctor.profile_updated", "Profile updated successfully"),
        "data": { "doctorProfile": profile }
    })))
}

#[axum::debug_handler]
pub async fn get_own_statistics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor])?;

    let statistics = DoctorService::new(state.db.clone())
        .refresh_statistics(user.id)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "statistics": statistics }
    })))
}
