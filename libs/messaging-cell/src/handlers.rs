use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::extractor::{ApiJson, ApiPath, ApiQuery};
use shared_utils::i18n::Locale;
use shared_utils::state::AppState;
use shared_utils::validation::validate_request;

use crate::models::{ConversationQuery, SendMessageRequest};
use crate::services::{deliver, MessageService};

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiJson(request): ApiJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    validate_request(&state, &locale, &request)?;

    let message = MessageService::new(state.db.clone())
        .send(&user, request)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    deliver(&state.hub, &message).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": state.t(locale.as_str(), "message.sent", "Message sent"),
            "data": { "message": message }
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    let conversations = MessageService::new(state.db.clone())
        .conversations(&user)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "conversations": conversations }
    })))
}

#[axum::debug_handler]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(other_user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ConversationQuery>,
) -> Result<Json<Value>, AppError> {
    let (messages, pagination) = MessageService::new(state.db.clone())
        .conversation(&user, other_user_id, &query)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "messages": messages, "pagination": pagination }
    })))
}

#[axum::debug_handler]
pub async fn mark_conversation_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
    ApiPath(other_user_id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let marked = MessageService::new(state.db.clone())
        .mark_read(&user, other_user_id)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "message": state.t(locale.as_str(), "message.marked_read", "Messages marked as read"),
        "data": { "marked": marked }
    })))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    locale: Locale,
) -> Result<Json<Value>, AppError> {
    let count = MessageService::new(state.db.clone())
        .unread_count(&user)
        .await
        .map_err(|e| e.into_app_error(&state, &locale))?;

    Ok(Json(json!({
        "success": true,
        "data": { "unreadCount": count }
    })))
}
