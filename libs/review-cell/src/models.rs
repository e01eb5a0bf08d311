use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use shared_database::embed;
use shared_models::error::{AppError, FieldError};
use shared_models::profile::PartyProfile;
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub client_id: Uuid,
    pub doctor_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub client: Option<PartyProfile>,
}

/// The booking fields a review is checked against.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewedBooking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub doctor_id: Uuid,
    pub status: String,
    #[serde(default, deserialize_with = "embed::one")]
    pub client: Option<PartyProfile>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[validate(required(message = "bookingId is required"))]
    pub booking_id: Option<Uuid>,

    #[validate(
        required(message = "rating is required"),
        range(min = 1, max = 5, message = "Rating must be between 1 and 5")
    )]
    pub rating: Option<i32>,

    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Booking not found")]
    BookingNotFound,

    #[error("Not authorized to review this booking")]
    Unauthorized,

    #[error("Session must be completed before reviewing")]
    SessionNotCompleted,

    #[error("Review already exists for this booking")]
    AlreadyExists,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ReviewError {
    pub fn into_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            ReviewError::BookingNotFound => AppError::NotFound(t("review.booking_not_found", "Booking not found")),
            ReviewError::Unauthorized => AppError::Forbidden(t(
                "review.unauthorized",
                "You are not authorized to review this booking",
            )),
            ReviewError::SessionNotCompleted => AppError::BadRequest(t(
                "review.session_not_completed",
                "Session must be completed before reviewing",
            )),
            ReviewError::AlreadyExists => {
                AppError::BadRequest(t("review.already_exists", "Review already exists for this booking"))
            }
            ReviewError::MissingField(field) => AppError::validation(
                t("validation.error", "Validation error"),
                vec![FieldError::new(field, format!("{} is required", field))],
            ),
            ReviewError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for ReviewError {
    fn from(err: anyhow::Error) -> Self {
        ReviewError::DatabaseError(err.to_string())
    }
}
