use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::extractor::{ApiJson, ApiQuery};
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;
use shared_utils::validation::validate_request;

use crate::models::{
    AuthError, ForgotPasswordRequest, LanguageRequest, LoginRequest, RegisterRequest, ResendVerificationRequest,
    ResetPasswordRequest, VerifyEmailQuery,
};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    validate_request(&state, &locale, &request)?;

    let (user, requires_verification) = AuthService::new(&state)
        .register(request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    let message = if requires_verification {
        state.t(
            locale.as_str(),
            "auth.register_success_verify",
            "Registration successful! Please check your email to verify your account.",
        )
    } else {
        state.t(
            locale.as_str(),
            "auth.register_success",
            "Registration successful! Please verify your account.",
        )
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": message,
            "data": { "user": user, "requiresVerification": requires_verification }
        })),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    validate_request(&state, &locale, &request)?;
    if request.email.is_none() && request.phone.is_none() {
        return Err(AuthError::ContactRequired.into_app_error(&state, &locale));
    }

    match AuthService::new(&state).login(request).await {
        Ok((user, token)) => Ok(Json(json!({
            "success": true,
            "message": state.t(locale.as_str(), "auth.login_success", "Login successful"),
            "data": { "user": user, "token": token }
        }))
        .into_response()),
        // The client needs the flag to offer a resend.
        Err(AuthError::EmailNotVerified) => Ok((
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "message": state.t(
                    locale.as_str(),
                    "auth.email_not_verified",
                    "Please verify your email address before logging in. Check your inbox for the verification link.",
                ),
                "requiresVerification": true
            })),
        )
            .into_response()),
        Err(e) => Err(e.into_app_error(&state, &locale)),
    }
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    let user = AuthService::new(&state)
        .me(&user)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "user": user }
    })))
}

#[axum::debug_handler]
pub async fn update_language(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiJson(request): ApiJson<LanguageRequest>,
) -> Result<Json<Value>, AppError> {
    let language = AuthService::new(&state)
        .update_language(&user, request.preferred_language.as_deref())
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(language.locale(), "auth.language_updated", "Language preference updated"),
        "data": { "user": { "id": user.id, "preferredLanguage": language } }
    })))
}

#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    validate_request(&state, &locale, &request)?;
    if request.email.is_none() && request.phone.is_none() {
        return Err(AuthError::ContactRequired.into_app_error(&state, &locale));
    }

    let ticket = AuthService::new(&state)
        .forgot_password(request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    let mut body = json!({
        "success": true,
        "message": state.t(
            locale.as_str(),
            "auth.forgot_password_sent",
            "If an account exists, a password reset link has been sent.",
        )
    });
    if state.config.is_development() {
        if let Some(ticket) = ticket {
            body["resetToken"] = json!(ticket.token);
            body["resetUrl"] = json!(ticket.url);
        }
    }

    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    validate_request(&state, &locale, &request)?;

    AuthService::new(&state)
        .reset_password(request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "auth.password_reset_success", "Password has been reset successfully")
    })))
}

#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiQuery(query): ApiQuery<VerifyEmailQuery>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(&state)
        .verify_email(query.token.as_deref())
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(
            locale.as_str(),
            "auth.email_verified",
            "Email verified successfully! You can now log in.",
        )
    })))
}

#[axum::debug_handler]
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    locale: Locale,
    ApiJson(request): ApiJson<ResendVerificationRequest>,
) -> Result<Json<Value>, AppError> {
    AuthService::new(&state)
        .resend_verification(request.email.as_deref())
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(
            locale.as_str(),
            "auth.verification_sent",
            "If an account exists, a verification email has been sent.",
        )
    })))
}
