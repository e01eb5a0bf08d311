use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use profile_cell::ProfileError;
use shared_database::embed;
use shared_models::auth::Role;
use shared_models::error::{AppError, FieldError};
use shared_models::profile::PartyProfile;
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Declined,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Declined => "DECLINED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "DECLINED" => Ok(BookingStatus::Declined),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionType {
    #[default]
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "chat")]
    Chat,
    #[serde(rename = "in-person")]
    InPerson,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Video => "video",
            SessionType::Chat => "chat",
            SessionType::InPerson => "in-person",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub doctor_id: Uuid,
    pub session_date: DateTime<Utc>,
    pub session_duration: i32,
    pub session_type: SessionType,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub client: Option<PartyProfile>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub doctor: Option<PartyProfile>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub payment: Option<BookingPayment>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub review: Option<BookingReview>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub session_note: Option<SessionNote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct BookingPayment {
    pub id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub screenshot: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct BookingReview {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct SessionNote {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub doctor_id: Uuid,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// The doctor's user id.
    #[validate(required(message = "doctorId is required"))]
    pub doctor_id: Option<Uuid>,

    #[validate(required(message = "sessionDate is required"), custom(function = "in_the_future"))]
    pub session_date: Option<DateTime<Utc>>,

    #[validate(range(min = 30, max = 180, message = "Session duration must be between 30 and 180 minutes"))]
    pub session_duration: Option<i32>,

    pub session_type: Option<SessionType>,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    /// When present the update only applies if the stored status still matches.
    pub expected_status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    #[validate(required(message = "sessionDate is required"), custom(function = "in_the_future"))]
    pub session_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SessionNoteRequest {
    #[validate(length(min = 1, message = "Notes are required"))]
    pub notes: String,
}

fn in_the_future(date: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *date > Utc::now() {
        Ok(())
    } else {
        let mut err = ValidationError::new("future");
        err.message = Some("Session date must be in the future".into());
        Err(err)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Unauthorized access to booking")]
    Unauthorized,

    #[error("Role {0} cannot change booking status")]
    RoleNotAllowed(Role),

    #[error("Invalid status for {0}")]
    InvalidStatus(Role),

    #[error("Invalid status filter: {0}")]
    InvalidStatusFilter(String),

    #[error("Payment must be completed before marking session as completed")]
    PaymentRequired,

    #[error("Payment must be completed before marking session as completed. Current payment status: {0}")]
    PaymentNotCompleted(String),

    #[error("Cannot reschedule this booking")]
    CannotReschedule(BookingStatus),

    #[error("Booking status changed, expected {0}")]
    StatusChanged(BookingStatus),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl BookingError {
    pub fn into_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            BookingError::NotFound => AppError::NotFound(t("booking.not_found", "Booking not found")),
            BookingError::DoctorNotFound => AppError::NotFound(t("booking.doctor_not_found", "Doctor not found")),
            BookingError::Unauthorized => AppError::Forbidden(t("booking.unauthorized", "Unauthorized")),
            BookingError::RoleNotAllowed(_) => AppError::Forbidden(t("booking.unauthorized", "Unauthorized")),
            BookingError::InvalidStatus(role) => {
                let fallback = match role {
                    Role::Doctor => "Invalid status for doctor",
                    _ => "Invalid status for client",
                };
                AppError::BadRequest(t("booking.invalid_status", fallback))
            }
            BookingError::InvalidStatusFilter(raw) => {
                AppError::BadRequest(format!("{}: {}", t("booking.invalid_status_filter", "Invalid status filter"), raw))
            }
            BookingError::PaymentRequired => AppError::BadRequest(t(
                "booking.payment_required",
                "Payment must be completed before marking session as completed",
            )),
            BookingError::PaymentNotCompleted(status) => AppError::BadRequest(format!(
                "{}. Current payment status: {}",
                t(
                    "booking.payment_not_completed",
                    "Payment must be completed before marking session as completed"
                ),
                status
            )),
            BookingError::CannotReschedule(_) => {
                AppError::BadRequest(t("booking.cannot_reschedule", "Cannot reschedule this booking"))
            }
            BookingError::StatusChanged(expected) => AppError::BadRequest(format!(
                "{} ({})",
                t("booking.status_conflict", "Booking status has changed since it was read"),
                expected
            )),
            BookingError::MissingField(field) => AppError::validation(
                t("validation.error", "Validation error"),
                vec![FieldError::new(field, format!("{} is required", field))],
            ),
            BookingError::Profile(e) => e.into_app_error(state, locale),
            BookingError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }

    /// Session note endpoints report the same failures under their own keys.
    pub fn into_note_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            BookingError::NotFound => AppError::NotFound(t("sessionNote.booking_not_found", "Booking not found")),
            BookingError::Unauthorized => AppError::Forbidden(t("sessionNote.unauthorized", "Unauthorized")),
            other => other.into_app_error(state, locale),
        }
    }
}

impl From<anyhow::Error> for BookingError {
    fn from(err: anyhow::Error) -> Self {
        BookingError::DatabaseError(err.to_string())
    }
}
