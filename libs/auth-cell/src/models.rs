use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use profile_cell::ProfileError;
use shared_models::auth::{Language, Role};
use shared_models::error::{AppError, FieldError};
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;
use shared_utils::validation::is_valid_phone;

pub const USER_ROW_COLUMNS: &str =
    "id,email,phone,password_hash,first_name,last_name,role,language,is_verified,created_at";

// ==============================================================================
// ROWS
// ==============================================================================

/// `users` row including the credential columns. Never serialized out.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub preferred_language: Language,
    pub is_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl PublicUser {
    pub fn from_row(row: UserRow, photo: Option<String>) -> Self {
        Self {
            id: row.id,
            email: row.email,
            phone: row.phone,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            preferred_language: row.language,
            is_verified: row.is_verified,
            created_at: row.created_at,
            photo,
        }
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(custom(function = "phone_format"))]
    pub phone: Option<String>,

    #[validate(
        required(message = "password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,

    #[validate(
        required(message = "firstName is required"),
        length(min = 2, max = 50, message = "First name must be between 2 and 50 characters")
    )]
    pub first_name: Option<String>,

    #[validate(
        required(message = "lastName is required"),
        length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters")
    )]
    pub last_name: Option<String>,

    #[validate(custom(function = "registrable_role"))]
    pub role: Option<String>,

    #[validate(custom(function = "supported_language"))]
    pub preferred_language: Option<String>,
}

impl RegisterRequest {
    /// Role defaults to CLIENT once validation has passed.
    pub fn role(&self) -> Role {
        self.role.as_deref().and_then(|r| r.parse().ok()).unwrap_or(Role::Client)
    }

    pub fn language(&self) -> Language {
        self.preferred_language
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    pub phone: Option<String>,

    #[validate(required(message = "password is required"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageRequest {
    pub preferred_language: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(required(message = "token is required"), length(min = 1, message = "token is required"))]
    pub token: Option<String>,

    #[validate(
        required(message = "password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendVerificationRequest {
    pub email: Option<String>,
}

fn phone_format(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Invalid phone number".into());
        Err(err)
    }
}

fn registrable_role(role: &str) -> Result<(), ValidationError> {
    match role.parse::<Role>() {
        Ok(Role::Client) | Ok(Role::Doctor) => Ok(()),
        _ => {
            let mut err = ValidationError::new("role");
            err.message = Some("Role must be CLIENT or DOCTOR".into());
            Err(err)
        }
    }
}

fn supported_language(language: &str) -> Result<(), ValidationError> {
    if language.parse::<Language>().is_ok() {
        Ok(())
    } else {
        let mut err = ValidationError::new("language");
        err.message = Some("Language must be ARABIC or FRENCH".into());
        Err(err)
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email or phone is required")]
    ContactRequired,

    #[error("User already exists")]
    UserExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid language")]
    InvalidLanguage,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Verification token is required")]
    VerificationTokenRequired,

    #[error("Invalid verification token")]
    InvalidVerificationToken,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Email is required")]
    EmailRequired,

    #[error("Failed to send email: {0}")]
    EmailDelivery(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AuthError {
    pub fn into_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            AuthError::ContactRequired => AppError::validation(
                t("validation.error", "Validation error"),
                vec![FieldError::new("email", t("validation.contact_required", "Email or phone is required"))],
            ),
            AuthError::UserExists => AppError::BadRequest(t("auth.user_exists", "User already exists")),
            AuthError::InvalidCredentials => AppError::Auth(t("auth.invalid_credentials", "Invalid credentials")),
            AuthError::EmailNotVerified => AppError::Forbidden(t(
                "auth.email_not_verified",
                "Please verify your email address before logging in. Check your inbox for the verification link.",
            )),
            AuthError::UserNotFound => AppError::NotFound(t("auth.user_not_found", "User not found")),
            AuthError::InvalidLanguage => AppError::BadRequest(t("validation.invalid_language", "Invalid language")),
            AuthError::InvalidResetToken => {
                AppError::BadRequest(t("auth.invalid_or_expired_token", "Invalid or expired reset token"))
            }
            AuthError::VerificationTokenRequired => AppError::BadRequest(t(
                "auth.verification_token_required",
                "Verification token is required",
            )),
            AuthError::InvalidVerificationToken => {
                AppError::BadRequest(t("auth.invalid_verification_token", "Invalid verification token"))
            }
            AuthError::AlreadyVerified => AppError::BadRequest(t("auth.already_verified", "Email is already verified")),
            AuthError::EmailRequired => AppError::BadRequest(t("auth.email_required", "Email is required")),
            AuthError::EmailDelivery(msg) => AppError::Internal(msg),
            AuthError::Token(msg) | AuthError::PasswordHash(msg) => AppError::Internal(msg),
            AuthError::Profile(e) => e.into_app_error(state, locale),
            AuthError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}
