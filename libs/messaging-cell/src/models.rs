use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use profile_cell::ProfileError;
use shared_database::embed;
use shared_models::error::{AppError, FieldError};
use shared_models::profile::{PartyProfile, UserSummary};
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;

pub const MAX_CONTENT_LENGTH: u64 = 2000;

/// Columns embedded for both ends of a message.
pub const MESSAGE_SELECT: &str =
    "*,sender:users!sender_id(id,first_name,last_name),receiver:users!receiver_id(id,first_name,last_name)";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    #[serde(default)]
    pub booking_id: Option<Uuid>,
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserSummary>,
    #[serde(default, deserialize_with = "embed::one", skip_serializing_if = "Option::is_none")]
    pub receiver: Option<UserSummary>,
}

impl Message {
    /// The other participant, seen from `me`.
    pub fn counterpart(&self, me: Uuid) -> Uuid {
        if self.sender_id == me {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(required(message = "receiverId is required"))]
    pub receiver_id: Option<Uuid>,

    #[validate(
        required(message = "content is required"),
        length(max = 2000, message = "Message must be at most 2000 characters"),
        custom(function = "not_blank")
    )]
    pub content: Option<String>,

    pub booking_id: Option<Uuid>,

    #[serde(rename = "type")]
    pub message_type: Option<MessageType>,
}

fn not_blank(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Message content cannot be empty".into());
        Err(err)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Most recent live booking between the caller and a counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct LatestBooking {
    pub id: Uuid,
    pub session_date: DateTime<Utc>,
    #[serde(default)]
    pub session_type: Option<String>,
    pub status: String,
}

/// Booking row used to find counterparts before any message exists.
#[derive(Debug, Clone, Deserialize)]
pub struct PairBooking {
    pub id: Uuid,
    pub session_date: DateTime<Utc>,
    #[serde(default)]
    pub session_type: Option<String>,
    pub status: String,
    #[serde(default, deserialize_with = "embed::one")]
    pub client: Option<PartyProfile>,
    #[serde(default, deserialize_with = "embed::one")]
    pub doctor: Option<PartyProfile>,
}

impl PairBooking {
    pub fn to_latest(&self) -> LatestBooking {
        LatestBooking {
            id: self.id,
            session_date: self.session_date,
            session_type: self.session_type.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user: Option<UserSummary>,
    pub last_message: Option<Message>,
    pub unread_count: u64,
    pub latest_booking: Option<LatestBooking>,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Receiver not found")]
    ReceiverNotFound,

    #[error("Cannot send a message to yourself")]
    SelfMessage,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Not a participant of this booking")]
    NotBookingParty,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl MessageError {
    pub fn into_app_error(self, state: &AppState, locale: &Locale) -> AppError {
        let t = |key: &str, fallback: &str| state.t(locale.as_str(), key, fallback);
        match self {
            MessageError::ReceiverNotFound => AppError::NotFound(t("message.receiver_not_found", "Receiver not found")),
            MessageError::SelfMessage => {
                AppError::BadRequest(t("message.self_message", "Cannot send a message to yourself"))
            }
            MessageError::BookingNotFound => AppError::NotFound(t("booking.not_found", "Booking not found")),
            MessageError::NotBookingParty => {
                AppError::Forbidden(t("booking.unauthorized", "You are not a participant of this booking"))
            }
            MessageError::MissingField(field) => AppError::validation(
                t("validation.error", "Validation error"),
                vec![FieldError::new(field, format!("{} is required", field))],
            ),
            MessageError::Profile(e) => e.into_app_error(state, locale),
            MessageError::DatabaseError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for MessageError {
    fn from(err: anyhow::Error) -> Self {
        MessageError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_content_is_invalid() {
        let request: SendMessageRequest =
            serde_json::from_value(json!({ "receiverId": Uuid::new_v4(), "content": "   " })).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("content"));
    }

    #[test]
    fn type_defaults_to_text_on_rows() {
        let row = json!({
            "id": Uuid::new_v4(),
            "sender_id": Uuid::new_v4(),
            "receiver_id": Uuid::new_v4(),
            "content": "hi",
            "created_at": "2024-05-01T10:00:00Z"
        });
        let message: Message = serde_json::from_value(row).unwrap();
        assert_eq!(message.message_type, MessageType::Text);

        let out = serde_json::to_value(&message).unwrap();
        assert_eq!(out["type"], "TEXT");
        assert_eq!(out["isRead"], false);
    }
}
