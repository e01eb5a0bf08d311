use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use profile_cell::ProfileError;
use shared_database::embed;
use shared_models::error::{AppError, FieldError};
use shared_models::profile::PartyProfile;
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;
use shared_utils::uploads::{MultipartForm, UploadError};

pub const DEFAULT_CURRENCY: &str = "MRU";
pub const MANUAL_METHOD: &str = "manual";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub client_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub payment_method: Option<String>,
    pub screenshot: Option<String>,
    pub status: PaymentStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub booking: Option<PaymentBooking>,
}

/// Booking slice embedded under a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct PaymentBooking {
    pub id: Uuid,
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub session_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub session_duration: Option<i32>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub client: Option<PartyProfile>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub doctor: Option<PartyProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentHistoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Text fields of the `POST /payments/submit` multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitPaymentForm {
    pub booking_id: Uuid,
    pub amount: f64,
    pub currency: String,
}

impl SubmitPaymentForm {
    pub fn from_form(form: &MultipartForm) -> Result<Self, PaymentError> {
        let mut errors = Vec::new();

        let booking_id = match form.text("bookingId").map(Uuid::parse_str) {
            Some(Ok(id)) => Some(id),
            Some(Err(_)) => {
                errors.push(FieldError::new("bookingId", "must be a valid id"));
                None
            }
            None => {
                errors.push(FieldError::new("bookingId", "bookingId is required"));
                None
            }
        };

        let amount = match form.text("amount").map(str::parse::<f64>) {
            Some(Ok(a)) if a.is_finite() && a > 0.0 => Some(a),
            Some(_) => {
                errors.push(FieldError::new("amount", "must be a positive number"));
                None
            }
            None => {
                errors.push(FieldError::new("amount", "amount is required"));
                None
            }
        };

        match (booking_id, amount) {
            (Some(booking_id), Some(amount)) if errors.is_empty() => Ok(Self {
                booking_id,
                amount,
                currency: form.text("currency").unwrap_or(DEFAULT_CURRENCY).to_uppercase(),
            }),
            _ => Err(PaymentError::InvalidForm(errors)),
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment screenshot is required")]
    ScreenshotRequired,

    #[error("Invalid payment form")]
    InvalidForm(Vec<FieldError>),

    #[error("Client profile not found")]
    ClientProfileNotFound,

    #[error("Doctor profile not found")]
    DoctorProfileNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Payment not found")]
    NotFound,

    #[error("Not allowed to pay for this booking")]
    NotBookingClient,

    #[error("Not allowed to verify this payment")]
    NotBookingDoctor,

    #[error("Booking must be confirmed before payment")]
    BookingNotConfirmed,

    #[error("Payment has already been processed")]
    AlreadyProcessed,

    #[error("Payments are only available to clients and doctors")]
    Unauthorized,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl PaymentError {
    pub fn into_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            PaymentError::ScreenshotRequired => {
                AppError::BadRequest(t("payment.screenshot_required", "Payment screenshot is required"))
            }
            PaymentError::InvalidForm(errors) => AppError::validation(t("validation.error", "Validation error"), errors),
            PaymentError::ClientProfileNotFound => {
                AppError::NotFound(t("payment.client_profile_not_found", "Client profile not found"))
            }
            PaymentError::DoctorProfileNotFound => {
                AppError::NotFound(t("payment.doctor_profile_not_found", "Doctor profile not found"))
            }
            PaymentError::BookingNotFound => AppError::NotFound(t("payment.booking_not_found", "Booking not found")),
            PaymentError::NotFound => AppError::NotFound(t("payment.not_found", "Payment not found")),
            PaymentError::NotBookingClient => AppError::Forbidden(t(
                "payment.unauthorized",
                "You don't have permission to pay for this booking",
            )),
            PaymentError::NotBookingDoctor => AppError::Forbidden(t(
                "payment.unauthorized",
                "You don't have permission to verify this payment",
            )),
            PaymentError::BookingNotConfirmed => AppError::BadRequest(t(
                "payment.booking_not_confirmed",
                "Booking must be confirmed before payment",
            )),
            PaymentError::AlreadyProcessed => {
                AppError::BadRequest(t("payment.already_processed", "Payment has already been processed"))
            }
            PaymentError::Unauthorized => AppError::Forbidden(t("payment.unauthorized", "Unauthorized")),
            PaymentError::Upload(e) => e.into(),
            PaymentError::Profile(e) => e.into_app_error(state, locale),
            PaymentError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for PaymentError {
    fn from(err: anyhow::Error) -> Self {
        PaymentError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn form(fields: &[(&str, &str)]) -> MultipartForm {
        MultipartForm {
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>(),
            files: HashMap::new(),
        }
    }

    #[test]
    fn currency_defaults_to_mru() {
        let id = Uuid::new_v4().to_string();
        let parsed = SubmitPaymentForm::from_form(&form(&[("bookingId", &id), ("amount", "500")])).unwrap();
        assert_eq!(parsed.currency, "MRU");
        assert_eq!(parsed.amount, 500.0);
    }

    #[test]
    fn amount_must_be_positive() {
        let id = Uuid::new_v4().to_string();
        for bad in ["0", "-10", "abc", "NaN"] {
            assert_matches!(
                SubmitPaymentForm::from_form(&form(&[("bookingId", &id), ("amount", bad)])),
                Err(PaymentError::InvalidForm(errors)) if errors[0].field == "amount"
            );
        }
    }

    #[test]
    fn every_missing_field_is_reported() {
        assert_matches!(
            SubmitPaymentForm::from_form(&form(&[])),
            Err(PaymentError::InvalidForm(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["bookingId", "amount"]);
            }
        );
    }
}
