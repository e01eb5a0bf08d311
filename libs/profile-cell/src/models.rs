use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use shared_database::embed;
use shared_models::error::AppError;
use shared_models::profile::{PartyProfile, UserSummary};
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;
use shared_utils::uploads::{MultipartForm, UploadError};
use shared_utils::validation::is_valid_phone;

// ==============================================================================
// PROFILE ROWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ClientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub profile_photo: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    #[serde(default)]
    pub specialization: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default)]
    pub available_hours: Value,
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub statistics: Option<DoctorStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<DoctorReview>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookings: Option<Vec<UpcomingBooking>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct DoctorReview {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "embed::one")]
    pub client: Option<PartyProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct UpcomingBooking {
    pub id: Uuid,
    pub session_date: DateTime<Utc>,
    pub session_duration: i32,
    pub session_type: String,
    pub status: String,
    #[serde(default, deserialize_with = "embed::one")]
    pub client: Option<PartyProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct DoctorStatistics {
    pub doctor_id: Uuid,
    pub total_sessions: i64,
    pub completed_sessions: i64,
    pub upcoming_sessions: i64,
    pub total_earnings: f64,
    pub monthly_earnings: f64,
    pub last_updated: DateTime<Utc>,
}

/// Booking slice the statistics are computed from.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsBooking {
    pub status: String,
    pub session_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "embed::one")]
    pub payment: Option<StatsPayment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsPayment {
    pub amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DoctorListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub specialization: Option<String>,
    pub language: Option<String>,
    pub search: Option<String>,
}

/// Identity fields shared by `PATCH /users/profile` and `PUT /doctors/profile`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UserFieldsUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl UserFieldsUpdate {
    pub fn from_form(form: &MultipartForm) -> Result<Self, ProfileError> {
        let phone = form.text("phone").map(str::to_string);
        if let Some(ref p) = phone {
            if !is_valid_phone(p) {
                return Err(ProfileError::InvalidField {
                    field: "phone".into(),
                    reason: "must be a valid phone number".into(),
                });
            }
        }
        let email = form.text("email").map(str::to_string);
        if let Some(ref e) = email {
            if !e.contains('@') {
                return Err(ProfileError::InvalidField {
                    field: "email".into(),
                    reason: "must be a valid email address".into(),
                });
            }
        }

        Ok(Self {
            first_name: form.text("firstName").map(str::to_string),
            last_name: form.text("lastName").map(str::to_string),
            email,
            phone,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Client-only fields. An empty string clears an address field; a missing
/// field leaves it untouched.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClientFieldsUpdate {
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl ClientFieldsUpdate {
    pub fn from_form(form: &MultipartForm) -> Result<Self, ProfileError> {
        let date_of_birth = match form.text("dateOfBirth") {
            Some(raw) => Some(parse_date(raw).ok_or_else(|| ProfileError::InvalidField {
                field: "dateOfBirth".into(),
                reason: "must be a date (YYYY-MM-DD)".into(),
            })?),
            None => None,
        };

        let raw = |name: &str| form.fields.get(name).map(|v| v.trim().to_string());

        Ok(Self {
            date_of_birth,
            address: raw("address"),
            city: raw("city"),
            country: raw("country"),
        })
    }

    pub fn to_patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(dob) = self.date_of_birth {
            patch.insert("date_of_birth".into(), Value::String(dob.to_string()));
        }
        for (column, value) in [("address", &self.address), ("city", &self.city), ("country", &self.country)] {
            if let Some(v) = value {
                let v = if v.is_empty() { Value::Null } else { Value::String(v.clone()) };
                patch.insert(column.into(), v);
            }
        }
        patch
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Doctor profile fields from a multipart body. List and map fields are
/// JSON-encoded strings; anything else is rejected.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DoctorProfileUpdate {
    pub bio: Option<String>,
    pub hourly_rate: Option<f64>,
    pub specialization: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub available_hours: Option<Map<String, Value>>,
}

impl DoctorProfileUpdate {
    pub fn from_form(form: &MultipartForm) -> Result<Self, ProfileError> {
        let hourly_rate = match form.text("hourlyRate") {
            Some(raw) => {
                let rate: f64 = raw.parse().map_err(|_| ProfileError::InvalidField {
                    field: "hourlyRate".into(),
                    reason: "must be a number".into(),
                })?;
                if !rate.is_finite() || rate < 0.0 {
                    return Err(ProfileError::InvalidField {
                        field: "hourlyRate".into(),
                        reason: "must be zero or more".into(),
                    });
                }
                Some(rate)
            }
            None => None,
        };

        Ok(Self {
            bio: form.fields.get("bio").map(|v| v.trim().to_string()),
            hourly_rate,
            specialization: json_field(form, "specialization")?,
            languages: json_field(form, "languages")?,
            available_hours: json_field(form, "availableHours")?,
        })
    }

    pub fn to_patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(ref bio) = self.bio {
            patch.insert("bio".into(), Value::String(bio.clone()));
        }
        if let Some(rate) = self.hourly_rate {
            patch.insert("hourly_rate".into(), Value::from(rate));
        }
        if let Some(ref s) = self.specialization {
            patch.insert("specialization".into(), Value::from(s.clone()));
        }
        if let Some(ref l) = self.languages {
            patch.insert("languages".into(), Value::from(l.clone()));
        }
        if let Some(ref hours) = self.available_hours {
            patch.insert("available_hours".into(), Value::Object(hours.clone()));
        }
        patch
    }
}

fn json_field<T: serde::de::DeserializeOwned>(form: &MultipartForm, name: &str) -> Result<Option<T>, ProfileError> {
    match form.text(name) {
        Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| ProfileError::InvalidField {
            field: name.to_string(),
            reason: format!("must be valid JSON ({})", e),
        }),
        None => Ok(None),
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("User not found")]
    UserNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Phone number already exists")]
    PhoneTaken,

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ProfileError {
    pub fn into_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            ProfileError::UserNotFound => AppError::NotFound(t("auth.user_not_found", "User not found")),
            ProfileError::DoctorNotFound => AppError::NotFound(t("doctor.not_found", "Doctor not found")),
            ProfileError::ProfileNotFound => AppError::NotFound(t("doctor.profile_not_found", "Profile not found")),
            ProfileError::EmailTaken => AppError::BadRequest(t("user.email_already_exists", "Email already exists")),
            ProfileError::PhoneTaken => AppError::BadRequest(t("user.phone_already_exists", "Phone number already exists")),
            ProfileError::InvalidField { field, reason } => AppError::validation(
                t("validation.error", "Validation error"),
                vec![shared_models::error::FieldError::new(field, reason)],
            ),
            ProfileError::Upload(e) => e.into(),
            ProfileError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for ProfileError {
    fn from(err: anyhow::Error) -> Self {
        ProfileError::DatabaseError(err.to_string())
    }
}
