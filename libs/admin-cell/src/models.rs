use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;

pub use booking_cell::BookingListQuery;

pub const ADMIN_USER_COLUMNS: &str = "id,email,phone,first_name,last_name,role,is_verified,created_at";

/// A user as the back office sees it. Credentials are never selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct AdminUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyUserRequest {
    #[validate(required(message = "isVerified is required"))]
    pub is_verified: Option<bool>,
}

// ==============================================================================
// ANALYTICS
// ==============================================================================

/// Completed payment slice used for revenue totals.
#[derive(Debug, Clone, Deserialize)]
pub struct RevenuePayment {
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserTotals {
    pub total: u64,
    pub clients: u64,
    pub doctors: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookingTotals {
    pub total: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RevenueTotals {
    pub total: f64,
    pub monthly: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Analytics {
    pub users: UserTotals,
    pub bookings: BookingTotals,
    pub revenue: RevenueTotals,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid role filter: {0}")]
    InvalidRole(String),

    #[error("Invalid status filter: {0}")]
    InvalidStatus(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AdminError {
    pub fn into_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            AdminError::UserNotFound => AppError::NotFound(t("admin.user_not_found", "User not found")),
            AdminError::InvalidRole(raw) => {
                AppError::BadRequest(format!("{}: {}", t("admin.invalid_role", "Invalid role filter"), raw))
            }
            AdminError::InvalidStatus(raw) => AppError::BadRequest(format!(
                "{}: {}",
                t("booking.invalid_status_filter", "Invalid status filter"),
                raw
            )),
            AdminError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        AdminError::DatabaseError(err.to_string())
    }
}
